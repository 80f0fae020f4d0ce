//! Multilingual tokenizer / 多语言分词器
//!
//! - CJK ideographs, Hiragana, Hangul syllables and Thai: one token per character / 单字成词
//! - Latin, Greek, Cyrillic letters and ASCII digits: word runs, lowercased / 字母数字连续成词
//! - Everything else separates runs and is dropped / 其他字符作为分隔符
//!
//! Single-character alphabet runs are never emitted.

/// Code point ranges accumulated into word runs / 字母类字符范围
const ALPHABETS: &[(u32, u32)] = &[
    (0x30, 0x39),   // 0-9
    (0x41, 0x5a),   // A-Z
    (0x61, 0x7a),   // a-z
    (0xc0, 0x2af),  // Latin-1 supplement / Latin extended A/B / IPA
    (0x370, 0x52f), // Greek / Cyrillic / Cyrillic supplement
];

/// Code point ranges emitted as one token per character / 单字类字符范围
const SINGLE_CHARS: &[(u32, u32)] = &[
    (0xe00, 0xe5b),   // Thai
    (0x3040, 0x309f), // Hiragana
    (0x4e00, 0x9fff), // CJK Unified Ideographs
    (0xac00, 0xd7af), // Hangul syllables
];

/// Words per minute used for reading time / 阅读速度（字/分钟）
pub const WORDS_PER_MINUTE: i64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Single,
    Alphabet,
    Separator,
}

fn in_ranges(c: char, ranges: &[(u32, u32)]) -> bool {
    let n = c as u32;
    ranges.iter().any(|&(start, end)| n >= start && n <= end)
}

fn classify(c: char) -> CharClass {
    if in_ranges(c, SINGLE_CHARS) {
        CharClass::Single
    } else if in_ranges(c, ALPHABETS) {
        CharClass::Alphabet
    } else {
        CharClass::Separator
    }
}

/// Push the pending run if it has at least two characters / 输出长度≥2的字母串
fn flush(run: &mut String, run_len: &mut usize, tokens: &mut Vec<String>) {
    if *run_len > 1 {
        tokens.push(run.to_lowercase());
    }
    run.clear();
    *run_len = 0;
}

/// Tokenize text, preserving token order / 对文本进行分词（保持顺序）
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut run = String::new();
    let mut run_len = 0usize;

    for c in text.chars() {
        match classify(c) {
            CharClass::Single => {
                flush(&mut run, &mut run_len, &mut tokens);
                tokens.push(c.to_string());
            }
            CharClass::Alphabet => {
                run.push(c);
                run_len += 1;
            }
            CharClass::Separator => flush(&mut run, &mut run_len, &mut tokens),
        }
    }
    flush(&mut run, &mut run_len, &mut tokens);

    tokens
}

/// Tokenize search query (used for queries) / 对搜索查询进行分词
pub fn tokenize_query(query: &str) -> Vec<String> {
    // Query tokenization consistent with index tokenization / 查询分词与索引分词保持一致
    tokenize(query)
}

/// Whitespace-delimited word count / 按空白统计词数
pub fn count_words(text: &str) -> i64 {
    text.split_whitespace().count() as i64
}

/// Reading time in whole minutes, rounded up / 阅读时间（分钟，向上取整）
pub fn reading_time(word_count: i64) -> i64 {
    if word_count <= 0 {
        return 0;
    }
    (word_count + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_english() {
        let tokens = tokenize("Hello World Test");
        assert_eq!(tokens, vec!["hello", "world", "test"]);
    }

    #[test]
    fn test_single_letters_dropped() {
        assert_eq!(tokenize("a b c I x"), Vec::<String>::new());
        assert_eq!(tokenize("C++ is a language"), vec!["is", "language"]);
    }

    #[test]
    fn test_tokenize_chinese() {
        let tokens = tokenize("你好世界");
        assert_eq!(tokens, vec!["你", "好", "世", "界"]);
    }

    #[test]
    fn test_tokenize_mixed() {
        let tokens = tokenize("测试文件test.txt");
        assert_eq!(tokens, vec!["测", "试", "文", "件", "test", "txt"]);

        // 单字类字符会先输出之前的字母串
        let tokens = tokenize("abc中x");
        assert_eq!(tokens, vec!["abc", "中"]);
    }

    #[test]
    fn test_tokenize_hangul_hiragana_thai() {
        assert_eq!(tokenize("한국"), vec!["한", "국"]);
        assert_eq!(tokenize("ひらがな"), vec!["ひ", "ら", "が", "な"]);
        assert_eq!(tokenize("ไทย"), vec!["ไ", "ท", "ย"]);
    }

    #[test]
    fn test_tokenize_greek_cyrillic_latin_ext() {
        assert_eq!(tokenize("Привет мир"), vec!["привет", "мир"]);
        assert_eq!(tokenize("ΑΘΗΝΑ"), vec!["αθηνα"]);
        assert_eq!(tokenize("Crème brûlée"), vec!["crème", "brûlée"]);
    }

    #[test]
    fn test_katakana_is_separator() {
        // Katakana is outside both classes
        assert_eq!(tokenize("カタカナ ok"), vec!["ok"]);
    }

    #[test]
    fn test_empty_and_punctuation() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("!!! ... ---").is_empty());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokenize("rust 2021 v1 7"), vec!["rust", "2021", "v1"]);
    }

    #[test]
    fn test_word_count_and_reading_time() {
        let text = "Hello hello world 你好 你好";
        assert_eq!(count_words(text), 5);
        assert_eq!(reading_time(5), 1);
        assert_eq!(reading_time(0), 0);
        assert_eq!(reading_time(200), 1);
        assert_eq!(reading_time(201), 2);
    }
}
