//! List request parameters: search, ordering, pagination and exact-match filters.

use crate::query::Window;
use crate::schema::{Direction, OrderBy, ResourceModel};
use crate::service::{coerce_str, FieldError, ValidationCode};
use serde_json::Value;
use std::collections::HashMap;

pub const SEARCH_PARAM: &str = "search";
pub const PAGE_PARAM: &str = "page";
pub const PER_PAGE_PARAM: &str = "per_page";
pub const ORDER_BY_PARAM: &str = "order_by";
pub const ORDER_DIRECTION_PARAM: &str = "order_by_direction";

/// Parameter names reserved for list control; never usable as filter fields.
pub const LIST_PARAMS: [&str; 5] = [
    SEARCH_PARAM,
    PAGE_PARAM,
    PER_PAGE_PARAM,
    ORDER_BY_PARAM,
    ORDER_DIRECTION_PARAM,
];

/// Page size used when a request supplies none, and the cap applied to any request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageSettings {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PageSettings {
    fn default() -> Self {
        PageSettings {
            default_page_size: 100,
            max_page_size: 1000,
        }
    }
}

impl PageSettings {
    /// Apply a resource's own overrides on top of the global settings.
    pub fn for_model(&self, model: &ResourceModel) -> PageSettings {
        let opts = model.list_options();
        let max_page_size = opts.max_page_size.unwrap_or(self.max_page_size);
        let default_page_size = opts
            .default_page_size
            .unwrap_or(self.default_page_size)
            .min(max_page_size);
        PageSettings {
            default_page_size,
            max_page_size,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListQuery {
    /// Trimmed, non-empty search term.
    pub search: Option<String>,
    pub order: OrderBy,
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
    pub filters: Vec<(String, Value)>,
}

impl ListQuery {
    /// No search, no filters, the model's default order, first page.
    pub fn for_model(model: &ResourceModel, pages: &PageSettings) -> Self {
        let pages = pages.for_model(model);
        ListQuery {
            search: None,
            order: model.list_options().default_order.clone(),
            page: 1,
            per_page: pages.default_page_size,
            filters: Vec::new(),
        }
    }

    pub fn from_params(
        model: &ResourceModel,
        params: &HashMap<String, String>,
        pages: &PageSettings,
    ) -> Result<Self, Vec<FieldError>> {
        let pages = pages.for_model(model);
        let mut query = ListQuery::for_model(model, &pages);
        let mut errors = Vec::new();

        query.search = params
            .get(SEARCH_PARAM)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        if let Some(field) = params.get(ORDER_BY_PARAM).map(|s| s.trim()).filter(|s| !s.is_empty()) {
            if model.schema().contains(field) {
                query.order = OrderBy::asc(field);
            } else {
                errors.push(FieldError::new(
                    ORDER_BY_PARAM,
                    ValidationCode::ConstraintViolated,
                    format!(
                        "{} must be one of: {}",
                        ORDER_BY_PARAM,
                        model.schema().names().collect::<Vec<_>>().join(", ")
                    ),
                ));
            }
        }
        if let Some(dir) = params.get(ORDER_DIRECTION_PARAM) {
            match Direction::parse(dir.trim()) {
                Some(d) => query.order.direction = d,
                None => errors.push(FieldError::new(
                    ORDER_DIRECTION_PARAM,
                    ValidationCode::ConstraintViolated,
                    format!("{} must be asc or desc", ORDER_DIRECTION_PARAM),
                )),
            }
        }

        match parse_positive(params, PAGE_PARAM) {
            Ok(Some(page)) => query.page = page,
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
        match parse_positive(params, PER_PAGE_PARAM) {
            Ok(Some(n)) => query.per_page = n.min(pages.max_page_size),
            Ok(None) => {}
            Err(e) => errors.push(e),
        }

        for name in &model.list_options().filter_fields {
            let (Some(raw), Some(spec)) = (params.get(name), model.schema().field(name)) else {
                continue;
            };
            match coerce_str(spec, raw) {
                Ok(v) => query.filters.push((name.clone(), v)),
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            Ok(query)
        } else {
            Err(errors)
        }
    }

    pub fn window(&self) -> Window {
        Window {
            limit: self.per_page,
            offset: u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page),
        }
    }
}

fn parse_positive(params: &HashMap<String, String>, name: &str) -> Result<Option<u32>, FieldError> {
    let Some(raw) = params.get(name) else {
        return Ok(None);
    };
    match raw.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Ok(Some(n)),
        Ok(_) => Err(FieldError::new(
            name,
            ValidationCode::ConstraintViolated,
            format!("{} must be at least 1", name),
        )),
        Err(_) => Err(FieldError::new(
            name,
            ValidationCode::InvalidType,
            format!("{} must be a positive integer", name),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn model() -> ResourceModel {
        crate::weather::weather_model().unwrap()
    }

    #[test]
    fn defaults() {
        let q = ListQuery::from_params(&model(), &HashMap::new(), &PageSettings::default()).unwrap();
        assert_eq!(q.search, None);
        assert_eq!(q.order, OrderBy::desc("recorded_at"));
        assert_eq!(q.window(), Window { limit: 100, offset: 0 });
    }

    #[test]
    fn blank_search_is_no_search() {
        let q = ListQuery::from_params(&model(), &params(&[("search", "   ")]), &PageSettings::default()).unwrap();
        assert_eq!(q.search, None);
        let q = ListQuery::from_params(&model(), &params(&[("search", " lon ")]), &PageSettings::default()).unwrap();
        assert_eq!(q.search.as_deref(), Some("lon"));
    }

    #[test]
    fn order_and_direction() {
        let q = ListQuery::from_params(
            &model(),
            &params(&[("order_by", "city"), ("order_by_direction", "DESC")]),
            &PageSettings::default(),
        )
        .unwrap();
        assert_eq!(q.order, OrderBy::desc("city"));

        let q = ListQuery::from_params(&model(), &params(&[("order_by", "city")]), &PageSettings::default()).unwrap();
        assert_eq!(q.order, OrderBy::asc("city"));
    }

    #[test]
    fn pagination_window_and_cap() {
        let pages = PageSettings {
            default_page_size: 10,
            max_page_size: 50,
        };
        let q = ListQuery::from_params(&model(), &params(&[("page", "3"), ("per_page", "20")]), &pages).unwrap();
        assert_eq!(q.window(), Window { limit: 20, offset: 40 });
        let q = ListQuery::from_params(&model(), &params(&[("per_page", "500")]), &pages).unwrap();
        assert_eq!(q.per_page, 50);
    }

    #[test]
    fn collects_every_bad_parameter() {
        let errors = ListQuery::from_params(
            &model(),
            &params(&[
                ("order_by", "altitude"),
                ("order_by_direction", "up"),
                ("page", "0"),
                ("per_page", "many"),
            ]),
            &PageSettings::default(),
        )
        .unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["order_by", "order_by_direction", "page", "per_page"]);
    }

    #[test]
    fn filters_are_typed() {
        let q = ListQuery::from_params(
            &model(),
            &params(&[("country", "UK"), ("city", "London")]),
            &PageSettings::default(),
        )
        .unwrap();
        assert_eq!(q.filters, vec![("country".to_string(), json!("UK"))]);
    }
}
