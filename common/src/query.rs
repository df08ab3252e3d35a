//! Translation of list request parameters into a storage-independent query.

use crate::types::{Severity, Status};
use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};

/// Raw list parameters as they arrive in a query string. Unknown
/// parameters are dropped by deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Id,
    Title,
    Service,
    Severity,
    Status,
    Owner,
    Summary,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub const ALL: [SortField; 9] = [
        SortField::Id,
        SortField::Title,
        SortField::Service,
        SortField::Severity,
        SortField::Status,
        SortField::Owner,
        SortField::Summary,
        SortField::CreatedAt,
        SortField::UpdatedAt,
    ];

    /// Name used in the `sortBy` parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::Service => "service",
            SortField::Severity => "severity",
            SortField::Status => "status",
            SortField::Owner => "owner",
            SortField::Summary => "summary",
            SortField::CreatedAt => "createdAt",
            SortField::UpdatedAt => "updatedAt",
        }
    }

    pub fn from_param(s: &str) -> Option<Self> {
        SortField::ALL.into_iter().find(|f| f.as_param() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_param(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: u32,
    /// Optional ceiling on `limit`. Without one the requested size is honoured.
    pub max_size: Option<u32>,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self { default_size: 10, max_size: None }
    }
}

/// Filters, sort and page of a list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentQuery {
    /// Case-insensitive substring over title, service and owner.
    pub search: Option<String>,
    pub severity: Option<Severity>,
    pub status: Option<Status>,
    /// Case-insensitive substring over service.
    pub service: Option<String>,
    pub sort: Sort,
    pub pagination: Pagination,
}

impl IncidentQuery {
    /// Everything, in default order, on a single page of `limit` rows.
    pub fn all(limit: u32) -> Self {
        Self {
            search: None,
            severity: None,
            status: None,
            service: None,
            sort: Sort::default(),
            pagination: Pagination { page: 1, limit },
        }
    }
}

pub fn translate(params: &ListParams, limits: PageLimits) -> Result<IncidentQuery, ValidationError> {
    let mut errors = Vec::new();

    let page = parse_positive(params.page.as_deref()).unwrap_or(1);
    let mut limit = parse_positive(params.limit.as_deref()).unwrap_or(limits.default_size);
    if let Some(max) = limits.max_size {
        limit = limit.min(max.max(1));
    }

    let severity = match non_empty(params.severity.as_deref()) {
        Some(s) => match s.parse::<Severity>() {
            Ok(v) => Some(v),
            Err(_) => {
                errors.push("severity must be one of the following values: SEV1, SEV2, SEV3, SEV4".to_string());
                None
            }
        },
        None => None,
    };

    let status = match non_empty(params.status.as_deref()) {
        Some(s) => match s.parse::<Status>() {
            Ok(v) => Some(v),
            Err(_) => {
                errors.push("status must be one of the following values: OPEN, MITIGATED, RESOLVED".to_string());
                None
            }
        },
        None => None,
    };

    let field = match non_empty(params.sort_by.as_deref()) {
        Some(s) => SortField::from_param(s).unwrap_or_else(|| {
            let names: Vec<_> = SortField::ALL.iter().map(|f| f.as_param()).collect();
            errors.push(format!("sortBy must be one of the following values: {}", names.join(", ")));
            SortField::default()
        }),
        None => SortField::default(),
    };

    let order = match non_empty(params.sort_order.as_deref()) {
        Some("asc") => SortOrder::Asc,
        Some("desc") => SortOrder::Desc,
        Some(_) => {
            errors.push("sortOrder must be one of the following values: asc, desc".to_string());
            SortOrder::default()
        }
        None => SortOrder::default(),
    };

    if !errors.is_empty() {
        return Err(ValidationError(errors));
    }

    Ok(IncidentQuery {
        search: non_empty(params.search.as_deref()).map(str::to_string),
        severity,
        status,
        service: non_empty(params.service.as_deref()).map(str::to_string),
        sort: Sort { field, order },
        pagination: Pagination { page, limit },
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_positive(value: Option<&str>) -> Option<u32> {
    non_empty(value)?.parse::<u32>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params() -> ListParams {
        ListParams::default()
    }

    #[test]
    fn defaults_to_first_page_newest_first() {
        let q = translate(&params(), PageLimits::default()).unwrap();
        assert_eq!(q, IncidentQuery::all(10));
        assert_eq!(q.sort.field, SortField::CreatedAt);
        assert_eq!(q.sort.order, SortOrder::Desc);
        assert_eq!(q.pagination.offset(), 0);
    }

    #[test]
    fn offset_follows_page_and_limit() {
        let q = translate(
            &ListParams {
                page: Some("2".into()),
                limit: Some("10".into()),
                ..params()
            },
            PageLimits::default(),
        )
        .unwrap();
        assert_eq!(q.pagination, Pagination { page: 2, limit: 10 });
        assert_eq!(q.pagination.offset(), 10);
    }

    #[test]
    fn bad_numbers_fall_back_and_large_limits_pass_through() {
        let q = translate(
            &ListParams {
                page: Some("zero".into()),
                limit: Some("0".into()),
                ..params()
            },
            PageLimits::default(),
        )
        .unwrap();
        assert_eq!(q.pagination, Pagination { page: 1, limit: 10 });

        let q = translate(
            &ListParams {
                page: Some("-3".into()),
                limit: Some("5000".into()),
                ..params()
            },
            PageLimits::default(),
        )
        .unwrap();
        assert_eq!(q.pagination, Pagination { page: 1, limit: 5000 });

        let capped = PageLimits { default_size: 10, max_size: Some(100) };
        let q = translate(
            &ListParams {
                limit: Some("5000".into()),
                ..params()
            },
            capped,
        )
        .unwrap();
        assert_eq!(q.pagination.limit, 100);
    }

    #[test]
    fn blank_filters_are_absent() {
        let q = translate(
            &ListParams {
                search: Some("   ".into()),
                service: Some("".into()),
                severity: Some("".into()),
                status: Some("".into()),
                ..params()
            },
            PageLimits::default(),
        )
        .unwrap();
        assert_eq!(q.search, None);
        assert_eq!(q.service, None);
        assert_eq!(q.severity, None);
        assert_eq!(q.status, None);
    }

    #[test]
    fn filters_and_sort_are_parsed() {
        let q = translate(
            &ListParams {
                search: Some(" payment ".into()),
                severity: Some("SEV1".into()),
                status: Some("MITIGATED".into()),
                service: Some("Gateway".into()),
                sort_by: Some("title".into()),
                sort_order: Some("asc".into()),
                ..params()
            },
            PageLimits::default(),
        )
        .unwrap();
        assert_eq!(q.search.as_deref(), Some("payment"));
        assert_eq!(q.severity, Some(Severity::Sev1));
        assert_eq!(q.status, Some(Status::Mitigated));
        assert_eq!(q.service.as_deref(), Some("Gateway"));
        assert_eq!(q.sort, Sort { field: SortField::Title, order: SortOrder::Asc });
    }

    #[test]
    fn invalid_enum_and_sort_values_are_rejected_together() {
        let err = translate(
            &ListParams {
                severity: Some("SEV5".into()),
                sort_by: Some("priority".into()),
                sort_order: Some("up".into()),
                ..params()
            },
            PageLimits::default(),
        )
        .unwrap_err();
        assert_eq!(err.messages().len(), 3);
        assert!(err.messages()[1].starts_with("sortBy must be one of"));
    }

    #[test]
    fn query_string_roundtrip_through_serde() {
        let p: ListParams = serde_json::from_value(serde_json::json!({
            "sortBy": "status",
            "sortOrder": "asc",
            "unknown": "dropped",
        }))
        .unwrap();
        assert_eq!(p.sort_by.as_deref(), Some("status"));
        assert_eq!(p.sort_order.as_deref(), Some("asc"));
    }
}
