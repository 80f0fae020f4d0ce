use serde::Deserialize;

use finder_backend::settings::DomainList;

/// Add/remove a domain filter entry / 域名条目编辑请求
#[derive(Debug, Deserialize)]
pub struct DomainEntryRequest {
    pub list: DomainList,
    pub domain: String,
}
