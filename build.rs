use chrono::{SecondsFormat, Utc};

fn main() {
    // Reported by GET /api/health / 健康检查中的构建时间
    println!(
        "cargo:rustc-env=BUILD_TIME={}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    println!("cargo:rerun-if-changed=build.rs");
}
