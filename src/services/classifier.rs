//! 文档分类服务 - 业务能力层
//!
//! 按文件名把文档归入固定的类别集合。
//!
//! 文件名先转小写，再把所有非字母数字字符替换为空格；然后按表中顺序逐个类别、
//! 逐个关键词匹配，第一个命中的类别胜出，全部未命中时为 `unknown_document`。

use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{AppError, AppResult, ConfigError, FileError};
use crate::models::DocumentCategory;

/// 关键词匹配方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// 关键词作为子串出现即可（`bankstmt` 命中 `bank`）
    #[default]
    Substring,
    /// 关键词必须是完整的词
    WordBoundary,
}

#[derive(Debug, Clone)]
struct CategoryRule {
    category: DocumentCategory,
    keywords: Vec<String>,
    patterns: Vec<Regex>,
}

/// 有序的关键词表
#[derive(Debug, Clone)]
pub struct KeywordTable {
    mode: MatchMode,
    rules: Vec<CategoryRule>,
}

#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default)]
    mode: MatchMode,
    categories: Vec<CategoryEntry>,
}

#[derive(Debug, Deserialize)]
struct CategoryEntry {
    name: String,
    keywords: Vec<String>,
}

fn default_entries() -> Vec<(DocumentCategory, Vec<&'static str>)> {
    vec![
        (DocumentCategory::BankStatement, vec!["bank", "statement", "stmt"]),
        (
            DocumentCategory::DriversLicense,
            vec!["license", "licence", "driver", "driving"],
        ),
        (DocumentCategory::PassportId, vec!["passport"]),
        (
            DocumentCategory::NationalId,
            vec![
                "national",
                "citizen",
                "residency",
                "id card",
                "identity",
                "identification",
            ],
        ),
        (
            DocumentCategory::UtilityBill,
            vec!["utility", "bill", "electricity", "water"],
        ),
        (DocumentCategory::ApplicationForm, vec!["application", "form"]),
        (DocumentCategory::Payslip, vec!["payslip", "salary", "payroll"]),
        (
            DocumentCategory::Insurance,
            vec!["insurance", "policy", "coverage", "premium"],
        ),
    ]
}

/// 归一化文件名：小写，非字母数字字符替换为空格
pub fn normalize(file_name: &str) -> String {
    file_name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                ' '
            }
        })
        .collect()
}

impl KeywordTable {
    /// 内置表
    pub fn canonical() -> &'static KeywordTable {
        static TABLE: OnceLock<KeywordTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            let entries = default_entries()
                .into_iter()
                .map(|(c, kws)| (c, kws.into_iter().map(String::from).collect()))
                .collect();
            KeywordTable::build(MatchMode::Substring, entries)
        })
    }

    /// 用自定义的类别顺序和关键词创建表
    ///
    /// 类别不能是 `unknown_document`，也不能重复；关键词归一化后不能为空
    pub fn new(
        mode: MatchMode,
        entries: Vec<(DocumentCategory, Vec<String>)>,
    ) -> AppResult<Self> {
        let mut seen = HashSet::new();
        for (category, keywords) in &entries {
            if *category == DocumentCategory::Unknown {
                return Err(invalid("unknown_document 不能出现在关键词表中"));
            }
            if !seen.insert(*category) {
                return Err(invalid(format!("类别 {} 重复", category)));
            }
            if keywords.iter().any(|k| normalize(k).trim().is_empty()) {
                return Err(invalid(format!("类别 {} 含有空关键词", category)));
            }
        }
        Ok(Self::build(mode, entries))
    }

    fn build(mode: MatchMode, entries: Vec<(DocumentCategory, Vec<String>)>) -> Self {
        let rules = entries
            .into_iter()
            .map(|(category, keywords)| {
                let keywords: Vec<String> = keywords
                    .iter()
                    .map(|k| normalize(k).trim().to_string())
                    .collect();
                // 归一化后的关键词只含 [a-z0-9 ]，转义后的模式总是合法
                let patterns = keywords
                    .iter()
                    .filter_map(|k| Regex::new(&format!(r"\b{}\b", regex::escape(k))).ok())
                    .collect();
                CategoryRule {
                    category,
                    keywords,
                    patterns,
                }
            })
            .collect();
        Self { mode, rules }
    }

    /// 解析 TOML 关键词表
    ///
    /// ```toml
    /// mode = "word_boundary"
    ///
    /// [[categories]]
    /// name = "passport_id"
    /// keywords = ["passport"]
    /// ```
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let file: TableFile = toml::from_str(content)?;
        let entries = file
            .categories
            .into_iter()
            .map(|entry| {
                let category: DocumentCategory = entry.name.parse()?;
                Ok((category, entry.keywords))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Self::new(file.mode, entries)
    }

    /// 从文件加载 TOML 关键词表
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        Self::from_toml_str(&content).map_err(|e| match e {
            AppError::File(FileError::TomlParseFailed { source, .. }) => {
                AppError::File(FileError::TomlParseFailed {
                    path: path.display().to_string(),
                    source,
                })
            }
            other => other,
        })
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// 文件名 → 类别；纯函数，总有结果
    pub fn classify(&self, file_name: &str) -> DocumentCategory {
        let normalized = normalize(file_name);
        self.rules
            .iter()
            .find(|rule| match self.mode {
                MatchMode::Substring => rule.keywords.iter().any(|k| normalized.contains(k.as_str())),
                MatchMode::WordBoundary => rule.patterns.iter().any(|p| p.is_match(&normalized)),
            })
            .map(|rule| rule.category)
            .unwrap_or(DocumentCategory::Unknown)
    }

    /// 按类别汇总文件名（逗号分隔）
    ///
    /// 表中的每个类别都会出现（可能为空串），`unknown_document` 只在用到时出现
    pub fn summarize<'a, I>(&self, file_names: I) -> Vec<(DocumentCategory, String)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut buckets: Vec<(DocumentCategory, Vec<&str>)> =
            self.rules.iter().map(|r| (r.category, Vec::new())).collect();
        let mut unknown = Vec::new();

        for name in file_names {
            let category = self.classify(name);
            match buckets.iter_mut().find(|(c, _)| *c == category) {
                Some((_, names)) => names.push(name),
                None => unknown.push(name),
            }
        }
        if !unknown.is_empty() {
            buckets.push((DocumentCategory::Unknown, unknown));
        }

        buckets
            .into_iter()
            .map(|(c, names)| (c, names.join(", ")))
            .collect()
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::canonical().clone()
    }
}

fn invalid(reason: impl Into<String>) -> AppError {
    ConfigError::InvalidKeywordTable {
        reason: reason.into(),
    }
    .into()
}

/// 用内置表分类
pub fn classify(file_name: &str) -> DocumentCategory {
    KeywordTable::canonical().classify(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_replaces_punctuation_with_spaces() {
        assert_eq!(normalize("Jane_Passport-2023.PDF"), "jane passport 2023 pdf");
        assert_eq!(normalize("Über.pdf"), " ber pdf");
    }

    #[test]
    fn classifies_documented_examples() {
        assert_eq!(classify("Jane_Passport_2023.pdf"), DocumentCategory::PassportId);
        assert_eq!(classify("March_Bank_Statement.pdf"), DocumentCategory::BankStatement);
        assert_eq!(classify("randomfile.pdf"), DocumentCategory::Unknown);
        assert_eq!(classify("id_card.jpg"), DocumentCategory::NationalId);
        assert_eq!(classify("bankstmt_march.pdf"), DocumentCategory::BankStatement);
        assert_eq!(classify("payslip1.pdf"), DocumentCategory::Payslip);
    }

    #[test]
    fn earlier_category_wins_ties() {
        assert_eq!(
            classify("bank_insurance_letter.pdf"),
            DocumentCategory::BankStatement
        );
        assert_eq!(
            classify("insurance_for_driver.pdf"),
            DocumentCategory::DriversLicense
        );
    }

    #[test]
    fn classify_is_deterministic() {
        for name in ["a.pdf", "Water Bill.PNG", "x_y_z", ""] {
            assert_eq!(classify(name), classify(name));
        }
        assert_eq!(classify(""), DocumentCategory::Unknown);
    }

    #[test]
    fn word_boundary_mode_needs_whole_words() {
        let table = KeywordTable::new(
            MatchMode::WordBoundary,
            vec![(DocumentCategory::BankStatement, vec!["bank".to_string()])],
        )
        .unwrap();
        assert_eq!(table.classify("bankstmt_march.pdf"), DocumentCategory::Unknown);
        assert_eq!(table.classify("my-bank-march.pdf"), DocumentCategory::BankStatement);
    }

    #[test]
    fn toml_table_can_reorder_categories() {
        let table = KeywordTable::from_toml_str(
            r#"
[[categories]]
name = "insurance"
keywords = ["insurance"]

[[categories]]
name = "bank_statement"
keywords = ["bank"]
"#,
        )
        .unwrap();
        assert_eq!(table.mode(), MatchMode::Substring);
        assert_eq!(
            table.classify("bank_insurance_letter.pdf"),
            DocumentCategory::Insurance
        );
    }

    #[test]
    fn toml_table_rejects_unknown_or_duplicate_categories() {
        let unknown = KeywordTable::from_toml_str(
            "[[categories]]\nname = \"mortgage_deed\"\nkeywords = [\"deed\"]\n",
        );
        assert!(matches!(
            unknown,
            Err(AppError::Config(ConfigError::UnknownCategory { .. }))
        ));

        let duplicate = KeywordTable::from_toml_str(
            "[[categories]]\nname = \"payslip\"\nkeywords = [\"a\"]\n[[categories]]\nname = \"payslip\"\nkeywords = [\"b\"]\n",
        );
        assert!(matches!(
            duplicate,
            Err(AppError::Config(ConfigError::InvalidKeywordTable { .. }))
        ));
    }

    #[test]
    fn summary_lists_every_category_and_unknown_only_when_used() {
        let table = KeywordTable::canonical();

        let summary = table.summarize(["id_card.jpg", "bankstmt_march.pdf"]);
        assert_eq!(summary.len(), 8);
        assert_eq!(summary[0], (DocumentCategory::BankStatement, "bankstmt_march.pdf".to_string()));
        assert_eq!(summary[3], (DocumentCategory::NationalId, "id_card.jpg".to_string()));

        let summary = table.summarize(["randomfile.pdf", "other.txt"]);
        assert_eq!(summary.len(), 9);
        assert_eq!(
            summary[8],
            (DocumentCategory::Unknown, "randomfile.pdf, other.txt".to_string())
        );
    }
}
