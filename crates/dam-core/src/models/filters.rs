use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Page sizes the catalog accepts.
pub const ALLOWED_PAGE_LIMITS: [u32; 4] = [10, 20, 50, 100];
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Page size restricted to [`ALLOWED_PAGE_LIMITS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageLimit(u32);

impl PageLimit {
    pub fn new(limit: u32) -> Option<Self> {
        ALLOWED_PAGE_LIMITS
            .contains(&limit)
            .then_some(PageLimit(limit))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for PageLimit {
    fn default() -> Self {
        PageLimit(DEFAULT_PAGE_LIMIT)
    }
}

impl TryFrom<u32> for PageLimit {
    type Error = String;

    fn try_from(limit: u32) -> Result<Self, Self::Error> {
        PageLimit::new(limit).ok_or_else(|| {
            format!(
                "Invalid page limit {}. Must be one of {:?}",
                limit, ALLOWED_PAGE_LIMITS
            )
        })
    }
}

impl From<PageLimit> for u32 {
    fn from(limit: PageLimit) -> Self {
        limit.0
    }
}

/// Fields the backend can sort on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Filename,
    FileSize,
    MimeType,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Filename => "filename",
            SortField::FileSize => "file_size",
            SortField::MimeType => "mime_type",
        }
    }
}

impl Display for SortField {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created_at" => Ok(SortField::CreatedAt),
            "updated_at" => Ok(SortField::UpdatedAt),
            "filename" | "name" => Ok(SortField::Filename),
            "file_size" | "size" => Ok(SortField::FileSize),
            "mime_type" | "type" => Ok(SortField::MimeType),
            _ => Err(anyhow::anyhow!("Invalid sort field: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            _ => Err(anyhow::anyhow!("Invalid sort order: {}", s)),
        }
    }
}

/// Catalog filters. Optional constraints are omitted from the query string
/// when unset or blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFilters {
    pub page: u32,
    pub limit: PageLimit,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl Default for AssetFilters {
    fn default() -> Self {
        AssetFilters {
            page: 1,
            limit: PageLimit::default(),
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            file_type: None,
            status: None,
            date_from: None,
            date_to: None,
            tags: Vec::new(),
            category: None,
            author: None,
            department: None,
            project: None,
        }
    }
}

impl AssetFilters {
    /// Apply a mutation. A mutation that touches any field other than `page`
    /// always lands on page 1, even if it also carries a page.
    pub fn apply(&mut self, update: FilterUpdate) {
        let resets_page = update.changes_non_page_field();

        if let Some(page) = update.page {
            self.page = page.max(1);
        }
        if let Some(limit) = update.limit {
            self.limit = limit;
        }
        if let Some(sort_by) = update.sort_by {
            self.sort_by = sort_by;
        }
        if let Some(sort_order) = update.sort_order {
            self.sort_order = sort_order;
        }
        if let Some(file_type) = update.file_type {
            self.file_type = file_type;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(date_from) = update.date_from {
            self.date_from = date_from;
        }
        if let Some(date_to) = update.date_to {
            self.date_to = date_to;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(author) = update.author {
            self.author = author;
        }
        if let Some(department) = update.department {
            self.department = department;
        }
        if let Some(project) = update.project {
            self.project = project;
        }

        if resets_page {
            self.page = 1;
        }
    }

    /// Builder-style variant of [`AssetFilters::apply`].
    pub fn with(mut self, update: FilterUpdate) -> Self {
        self.apply(update);
        self
    }

    /// Same constraints, first page, newest first.
    pub fn newest_first(&self) -> Self {
        self.clone().with(
            FilterUpdate::default()
                .sort_by(SortField::CreatedAt)
                .sort_order(SortOrder::Desc),
        )
    }

    /// Query parameters for `GET /assets`: `page` and `limit` first, then
    /// every non-empty constraint. Array fields repeat the parameter.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.get().to_string()),
            ("sortBy", self.sort_by.as_str().to_string()),
            ("sortOrder", self.sort_order.as_str().to_string()),
        ];

        let optional = [
            ("fileType", &self.file_type),
            ("status", &self.status),
            ("dateFrom", &self.date_from),
            ("dateTo", &self.date_to),
        ];
        for (key, value) in optional {
            if let Some(v) = non_blank(value) {
                pairs.push((key, v.to_string()));
            }
        }

        for tag in self.tags.iter().filter(|t| !t.trim().is_empty()) {
            pairs.push(("tags", tag.clone()));
        }

        let optional = [
            ("category", &self.category),
            ("author", &self.author),
            ("department", &self.department),
            ("project", &self.project),
        ];
        for (key, value) in optional {
            if let Some(v) = non_blank(value) {
                pairs.push((key, v.to_string()));
            }
        }

        pairs
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A partial filter mutation. `None` leaves a field untouched; for optional
/// constraints `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterUpdate {
    pub page: Option<u32>,
    pub limit: Option<PageLimit>,
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortOrder>,
    pub file_type: Option<Option<String>>,
    pub status: Option<Option<String>>,
    pub date_from: Option<Option<String>>,
    pub date_to: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub category: Option<Option<String>>,
    pub author: Option<Option<String>>,
    pub department: Option<Option<String>>,
    pub project: Option<Option<String>>,
}

impl FilterUpdate {
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: PageLimit) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort_by(mut self, sort_by: SortField) -> Self {
        self.sort_by = Some(sort_by);
        self
    }

    pub fn sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    pub fn file_type(mut self, file_type: Option<String>) -> Self {
        self.file_type = Some(blank_to_none(file_type));
        self
    }

    pub fn status(mut self, status: Option<String>) -> Self {
        self.status = Some(blank_to_none(status));
        self
    }

    pub fn date_range(mut self, date_from: Option<String>, date_to: Option<String>) -> Self {
        self.date_from = Some(blank_to_none(date_from));
        self.date_to = Some(blank_to_none(date_to));
        self
    }

    pub fn date_preset(self, preset: DateRangePreset, today: NaiveDate) -> Self {
        let (from, to) = preset.bounds(today);
        self.date_range(from, to)
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn category(mut self, category: Option<String>) -> Self {
        self.category = Some(blank_to_none(category));
        self
    }

    pub fn author(mut self, author: Option<String>) -> Self {
        self.author = Some(blank_to_none(author));
        self
    }

    pub fn department(mut self, department: Option<String>) -> Self {
        self.department = Some(blank_to_none(department));
        self
    }

    pub fn project(mut self, project: Option<String>) -> Self {
        self.project = Some(blank_to_none(project));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.page.is_none() && !self.changes_non_page_field()
    }

    pub fn changes_non_page_field(&self) -> bool {
        self.limit.is_some()
            || self.sort_by.is_some()
            || self.sort_order.is_some()
            || self.file_type.is_some()
            || self.status.is_some()
            || self.date_from.is_some()
            || self.date_to.is_some()
            || self.tags.is_some()
            || self.category.is_some()
            || self.author.is_some()
            || self.department.is_some()
            || self.project.is_some()
    }
}

/// Relative date windows offered by the gallery filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRangePreset {
    #[default]
    All,
    Today,
    Week,
    Month,
    Year,
}

impl DateRangePreset {
    /// `(dateFrom, dateTo)` as `YYYY-MM-DD`, both `None` for [`DateRangePreset::All`].
    pub fn bounds(&self, today: NaiveDate) -> (Option<String>, Option<String>) {
        let days_back = match self {
            DateRangePreset::All => return (None, None),
            DateRangePreset::Today => 0,
            DateRangePreset::Week => 7,
            DateRangePreset::Month => 30,
            DateRangePreset::Year => 365,
        };
        let from = today - Duration::days(days_back);
        (
            Some(from.format("%Y-%m-%d").to_string()),
            Some(today.format("%Y-%m-%d").to_string()),
        )
    }
}

impl FromStr for DateRangePreset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(DateRangePreset::All),
            "today" => Ok(DateRangePreset::Today),
            "week" => Ok(DateRangePreset::Week),
            "month" => Ok(DateRangePreset::Month),
            "year" => Ok(DateRangePreset::Year),
            _ => Err(anyhow::anyhow!("Invalid date range: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filtered() -> AssetFilters {
        AssetFilters {
            page: 4,
            limit: PageLimit::new(50).unwrap(),
            sort_by: SortField::FileSize,
            sort_order: SortOrder::Asc,
            file_type: Some("image".to_string()),
            status: Some("processed".to_string()),
            date_from: Some("2024-01-01".to_string()),
            date_to: Some("2024-01-31".to_string()),
            tags: vec!["brand".to_string(), "q1".to_string()],
            category: Some("marketing".to_string()),
            author: Some("lee".to_string()),
            department: Some("design".to_string()),
            project: Some("rebrand".to_string()),
        }
    }

    #[test]
    fn test_page_only_mutation_preserves_other_fields() {
        let before = filtered();
        let after = before.clone().with(FilterUpdate::default().page(9));

        assert_eq!(after.page, 9);
        assert_eq!(AssetFilters { page: 4, ..after }, before);
    }

    #[test]
    fn test_every_non_page_field_resets_page() {
        let updates = vec![
            FilterUpdate::default().limit(PageLimit::new(10).unwrap()),
            FilterUpdate::default().sort_by(SortField::Filename),
            FilterUpdate::default().sort_order(SortOrder::Desc),
            FilterUpdate::default().file_type(Some("video".to_string())),
            FilterUpdate::default().status(None),
            FilterUpdate::default().date_range(None, None),
            FilterUpdate::default().tags(vec![]),
            FilterUpdate::default().category(Some("legal".to_string())),
            FilterUpdate::default().author(None),
            FilterUpdate::default().department(Some("hr".to_string())),
            FilterUpdate::default().project(None),
        ];

        for update in updates {
            let after = filtered().with(update.clone());
            assert_eq!(after.page, 1, "update {:?} did not reset page", update);
        }
    }

    #[test]
    fn test_multi_field_mutation_with_page_still_resets() {
        let after = filtered().with(
            FilterUpdate::default()
                .page(7)
                .file_type(Some("document".to_string())),
        );
        assert_eq!(after.page, 1);
        assert_eq!(after.file_type.as_deref(), Some("document"));
    }

    #[test]
    fn test_page_zero_is_clamped() {
        let after = AssetFilters::default().with(FilterUpdate::default().page(0));
        assert_eq!(after.page, 1);
    }

    #[test]
    fn test_blank_values_clear_constraints() {
        let after = filtered().with(FilterUpdate::default().category(Some("  ".to_string())));
        assert_eq!(after.category, None);
    }

    #[test]
    fn test_query_pairs_skip_empty_and_repeat_arrays() {
        let filters = AssetFilters {
            tags: vec!["a".to_string(), "".to_string(), "b".to_string()],
            category: Some(String::new()),
            ..AssetFilters::default()
        };

        let pairs = filters.query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("page", "1".to_string()),
                ("limit", "20".to_string()),
                ("sortBy", "created_at".to_string()),
                ("sortOrder", "DESC".to_string()),
                ("tags", "a".to_string()),
                ("tags", "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_pairs_full() {
        let keys: Vec<&str> = filtered().query_pairs().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec![
                "page",
                "limit",
                "sortBy",
                "sortOrder",
                "fileType",
                "status",
                "dateFrom",
                "dateTo",
                "tags",
                "tags",
                "category",
                "author",
                "department",
                "project"
            ]
        );
    }

    #[test]
    fn test_newest_first_keeps_constraints() {
        let refreshed = filtered().newest_first();
        assert_eq!(refreshed.page, 1);
        assert_eq!(refreshed.sort_by, SortField::CreatedAt);
        assert_eq!(refreshed.sort_order, SortOrder::Desc);
        assert_eq!(refreshed.category.as_deref(), Some("marketing"));
    }

    #[test]
    fn test_page_limit_rejects_unknown_sizes() {
        assert!(PageLimit::new(25).is_none());
        assert_eq!(PageLimit::new(100).map(PageLimit::get), Some(100));
        assert!(serde_json::from_value::<PageLimit>(serde_json::json!(30)).is_err());
    }

    #[test]
    fn test_date_presets() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(DateRangePreset::All.bounds(today), (None, None));
        assert_eq!(
            DateRangePreset::Today.bounds(today),
            (Some("2024-03-10".to_string()), Some("2024-03-10".to_string()))
        );
        assert_eq!(
            DateRangePreset::Week.bounds(today).0.as_deref(),
            Some("2024-03-03")
        );
        assert_eq!(
            DateRangePreset::Year.bounds(today).0.as_deref(),
            Some("2023-03-11")
        );
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!("size".parse::<SortField>().unwrap(), SortField::FileSize);
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert!("random".parse::<SortField>().is_err());
    }
}
