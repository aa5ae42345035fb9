//! Request validation from schema descriptors.

use crate::schema::{FieldSpec, FieldType, Record, ResourceModel, SchemaDescriptor, StringFormat};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Number, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCode {
    Required,
    InvalidType,
    ConstraintViolated,
    InvalidFormat,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::Required => "required",
            ValidationCode::InvalidType => "invalid_type",
            ValidationCode::ConstraintViolated => "constraint_violated",
            ValidationCode::InvalidFormat => "invalid_format",
        }
    }
}

/// One problem with one field (or query parameter).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: ValidationCode,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: ValidationCode, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            code,
            message: message.into(),
        }
    }

    fn required(field: &str) -> Self {
        FieldError::new(field, ValidationCode::Required, format!("{} is required", field))
    }

    fn invalid_type(spec: &FieldSpec) -> Self {
        FieldError::new(
            &spec.name,
            ValidationCode::InvalidType,
            format!("{} must be of type {}", spec.name, spec.ty.name()),
        )
    }

    fn constraint(field: &str, detail: String) -> Self {
        FieldError::new(field, ValidationCode::ConstraintViolated, detail)
    }

    fn format(field: &str, detail: String) -> Self {
        FieldError::new(field, ValidationCode::InvalidFormat, detail)
    }
}

pub struct RequestValidator;

impl RequestValidator {
    /// Validate `body` against `fields`. Keys outside `fields` are dropped. Every offending
    /// field contributes one error; nothing is returned until all fields are checked.
    pub fn validate(body: &Map<String, Value>, fields: &SchemaDescriptor) -> Result<Record, Vec<FieldError>> {
        let mut record = Record::new();
        let mut errors = Vec::new();
        for spec in fields.fields() {
            match check_field(spec, body.get(&spec.name)) {
                Ok(Some(v)) => {
                    record.insert(spec.name.clone(), v);
                }
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }
        if errors.is_empty() {
            Ok(record)
        } else {
            Err(errors)
        }
    }

    /// Parse a path key into (field, value) pairs. Composite keys are comma separated in key order.
    pub fn parse_key(model: &ResourceModel, raw: &str) -> Result<Vec<(String, Value)>, Vec<FieldError>> {
        let keys = model.primary_keys();
        let parts: Vec<&str> = if keys.len() == 1 {
            vec![raw]
        } else {
            raw.split(',').collect()
        };
        if parts.len() != keys.len() {
            return Err(vec![FieldError::new(
                keys.join(","),
                ValidationCode::InvalidType,
                format!("key must have {} comma-separated parts", keys.len()),
            )]);
        }
        let mut out = Vec::with_capacity(keys.len());
        let mut errors = Vec::new();
        for (name, part) in keys.iter().zip(parts) {
            let Some(spec) = model.schema().field(name) else {
                continue;
            };
            match coerce_str(spec, part) {
                Ok(v) => out.push((name.clone(), v)),
                Err(e) => errors.push(e),
            }
        }
        if errors.is_empty() {
            Ok(out)
        } else {
            Err(errors)
        }
    }
}

/// Convert a raw string (path segment or query parameter) to a typed value for `spec`.
pub fn coerce_str(spec: &FieldSpec, raw: &str) -> Result<Value, FieldError> {
    let s = raw.trim();
    let v = match spec.ty {
        FieldType::Integer => {
            let n: i64 = s.parse().map_err(|_| FieldError::invalid_type(spec))?;
            Value::Number(n.into())
        }
        FieldType::Float => {
            let n: f64 = s.parse().map_err(|_| FieldError::invalid_type(spec))?;
            Value::Number(Number::from_f64(n).ok_or_else(|| FieldError::invalid_type(spec))?)
        }
        FieldType::Boolean => match s {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(FieldError::invalid_type(spec)),
        },
        FieldType::Timestamp => Value::String(canonical_datetime(&spec.name, s)?),
        FieldType::String => match spec.format {
            Some(StringFormat::Uuid) => Value::String(canonical_uuid(&spec.name, s)?),
            Some(StringFormat::DateTime) => Value::String(canonical_datetime(&spec.name, s)?),
            _ => Value::String(raw.to_string()),
        },
    };
    Ok(v)
}

fn check_field(spec: &FieldSpec, value: Option<&Value>) -> Result<Option<Value>, FieldError> {
    let v = match value {
        None => {
            return if spec.required {
                Err(FieldError::required(&spec.name))
            } else {
                Ok(None)
            };
        }
        Some(Value::Null) if spec.nullable => return Ok(Some(Value::Null)),
        Some(Value::Null) if spec.required => return Err(FieldError::required(&spec.name)),
        Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };
    let v = check_type(spec, v)?;
    check_constraints(spec, v).map(Some)
}

fn check_type(spec: &FieldSpec, v: &Value) -> Result<Value, FieldError> {
    match (spec.ty, v) {
        (FieldType::Integer, Value::Number(n)) => {
            if n.is_i64() || n.is_u64() {
                return Ok(v.clone());
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                    Ok(Value::Number((f as i64).into()))
                }
                _ => Err(FieldError::invalid_type(spec)),
            }
        }
        // float fields always carry an f64, matching what double precision columns return
        (FieldType::Float, Value::Number(n)) => n
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| FieldError::invalid_type(spec)),
        (FieldType::String, Value::String(_)) => Ok(v.clone()),
        (FieldType::Boolean, Value::Bool(_)) => Ok(v.clone()),
        (FieldType::Timestamp, Value::String(s)) => Ok(Value::String(canonical_datetime(&spec.name, s)?)),
        _ => Err(FieldError::invalid_type(spec)),
    }
}

fn check_constraints(spec: &FieldSpec, v: Value) -> Result<Value, FieldError> {
    let col = spec.name.as_str();
    if let Some(n) = v.as_f64() {
        if let Some(min) = spec.minimum {
            if n < min {
                return Err(FieldError::constraint(col, format!("{} must be at least {}", col, min)));
            }
        }
        if let Some(max) = spec.maximum {
            if n > max {
                return Err(FieldError::constraint(col, format!("{} must be at most {}", col, max)));
            }
        }
    }
    let v = match (&v, spec.format) {
        (Value::String(s), Some(format)) => Value::String(check_format(col, s, format)?),
        _ => v,
    };
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = spec.max_length {
            if len > max {
                return Err(FieldError::constraint(
                    col,
                    format!("{} must be at most {} characters", col, max),
                ));
            }
        }
        if let Some(min) = spec.min_length {
            if len < min {
                return Err(FieldError::constraint(
                    col,
                    format!("{} must be at least {} characters", col, min),
                ));
            }
        }
        if let Some(re) = &spec.pattern {
            if !re.is_match(s) {
                return Err(FieldError::constraint(col, format!("{} does not match required pattern", col)));
            }
        }
    }
    if let Some(allowed) = &spec.allowed {
        if !allowed.iter().any(|a| value_eq(&v, a)) {
            return Err(FieldError::constraint(
                col,
                format!(
                    "{} must be one of: {:?}",
                    col,
                    allowed.iter().take(5).collect::<Vec<_>>()
                ),
            ));
        }
    }
    Ok(v)
}

fn check_format(col: &str, s: &str, format: StringFormat) -> Result<String, FieldError> {
    match format {
        StringFormat::DateTime => canonical_datetime(col, s),
        StringFormat::Uuid => canonical_uuid(col, s),
        StringFormat::Email => {
            let valid = s
                .split_once('@')
                .map(|(local, domain)| !local.is_empty() && !domain.is_empty())
                .unwrap_or(false);
            if valid {
                Ok(s.to_string())
            } else {
                Err(FieldError::format(col, format!("{} must be a valid email", col)))
            }
        }
    }
}

/// RFC 3339 → UTC with millisecond precision, e.g. `2025-09-16T12:00:00.000Z`.
pub fn canonical_datetime(col: &str, s: &str) -> Result<String, FieldError> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true))
        .map_err(|_| FieldError::format(col, format!("{} must be an ISO-8601 datetime", col)))
}

fn canonical_uuid(col: &str, s: &str) -> Result<String, FieldError> {
    uuid::Uuid::parse_str(s)
        .map(|u| u.to_string())
        .map_err(|_| FieldError::format(col, format!("{} must be a valid UUID", col)))
}

/// Equality that treats 1 and 1.0 as the same number.
pub fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Operation, ResourceModel};
    use serde_json::json;

    fn model() -> ResourceModel {
        crate::weather::weather_model().unwrap()
    }

    fn body(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    fn london() -> Map<String, Value> {
        body(json!({
            "city": "London",
            "country": "UK",
            "temperature": 20.5,
            "humidity": 65,
            "description": "Partly cloudy",
            "wind_speed": 5.2,
            "recorded_at": "2025-09-16T12:00:00.000Z"
        }))
    }

    #[test]
    fn accepts_full_payload() {
        let m = model();
        let record = RequestValidator::validate(&london(), m.fields_for(Operation::Create)).unwrap();
        assert_eq!(record.len(), 7);
        assert_eq!(record["city"], json!("London"));
        assert_eq!(record["humidity"], json!(65.0));
    }

    #[test]
    fn reports_every_missing_field() {
        let m = model();
        let errors = RequestValidator::validate(
            &body(json!({"description": "only this"})),
            m.fields_for(Operation::Create),
        )
        .unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["city", "country", "temperature", "humidity", "wind_speed", "recorded_at"]
        );
        assert!(errors.iter().all(|e| e.code == ValidationCode::Required));
    }

    #[test]
    fn ignores_fields_outside_the_subset() {
        let m = model();
        let mut payload = london();
        payload.insert("id".into(), json!(42));
        payload.insert("extra".into(), json!("x"));
        let record = RequestValidator::validate(&payload, m.fields_for(Operation::Create)).unwrap();
        assert!(!record.contains_key("id"));
        assert!(!record.contains_key("extra"));
    }

    #[test]
    fn bounds_are_inclusive() {
        let m = model();
        for h in [json!(0), json!(100), json!(0.0), json!(100.0)] {
            let mut payload = london();
            payload.insert("humidity".into(), h);
            assert!(RequestValidator::validate(&payload, m.fields_for(Operation::Create)).is_ok());
        }
        let mut payload = london();
        payload.insert("humidity".into(), json!(100.5));
        payload.insert("wind_speed".into(), json!(-1));
        let errors = RequestValidator::validate(&payload, m.fields_for(Operation::Create)).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.code == ValidationCode::ConstraintViolated));
    }

    #[test]
    fn type_mismatch_is_reported_per_field() {
        let m = model();
        let mut payload = london();
        payload.insert("temperature".into(), json!("warm"));
        payload.insert("city".into(), json!(12));
        let errors = RequestValidator::validate(&payload, m.fields_for(Operation::Create)).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "city");
        assert_eq!(errors[0].code, ValidationCode::InvalidType);
        assert_eq!(errors[1].field, "temperature");
    }

    #[test]
    fn datetime_is_canonicalized() {
        let m = model();
        let mut payload = london();
        payload.insert("recorded_at".into(), json!("2025-09-16T14:00:00+02:00"));
        let record = RequestValidator::validate(&payload, m.fields_for(Operation::Create)).unwrap();
        assert_eq!(record["recorded_at"], json!("2025-09-16T12:00:00.000Z"));
    }

    #[test]
    fn bad_datetime_is_invalid_format() {
        let m = model();
        let mut payload = london();
        payload.insert("recorded_at".into(), json!("yesterday"));
        let errors = RequestValidator::validate(&payload, m.fields_for(Operation::Create)).unwrap_err();
        assert_eq!(errors[0].code, ValidationCode::InvalidFormat);
    }

    #[test]
    fn null_counts_as_missing_unless_nullable() {
        let schema = SchemaDescriptor::new(vec![
            FieldSpec::string("a"),
            FieldSpec::string("b").nullable(),
            FieldSpec::string("c").optional(),
        ]);
        let errors =
            RequestValidator::validate(&body(json!({"a": null, "b": null, "c": null})), &schema).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "a");
        let record = RequestValidator::validate(&body(json!({"a": "x", "b": null, "c": null})), &schema).unwrap();
        assert_eq!(record.get("b"), Some(&Value::Null));
        assert!(!record.contains_key("c"));
    }

    #[test]
    fn float_fields_always_carry_a_float() {
        let schema = SchemaDescriptor::new(vec![FieldSpec::float("x").allowed(vec![json!(1)])]);
        let record = RequestValidator::validate(&body(json!({"x": 1})), &schema).unwrap();
        assert_eq!(record["x"], json!(1.0));
        assert!(record["x"].is_f64());
    }

    #[test]
    fn integral_floats_are_integers() {
        let schema = SchemaDescriptor::new(vec![FieldSpec::integer("n")]);
        let record = RequestValidator::validate(&body(json!({"n": 3.0})), &schema).unwrap();
        assert_eq!(record["n"], json!(3));
        let errors = RequestValidator::validate(&body(json!({"n": 3.5})), &schema).unwrap_err();
        assert_eq!(errors[0].code, ValidationCode::InvalidType);
    }

    #[test]
    fn string_rules() {
        let schema = SchemaDescriptor::new(vec![
            FieldSpec::string("code")
                .min_length(2)
                .max_length(3)
                .pattern(regex::Regex::new("^[A-Z]+$").unwrap()),
            FieldSpec::string("mail").format(StringFormat::Email),
            FieldSpec::string("level").allowed(vec![json!("low"), json!("high")]),
        ]);
        assert!(RequestValidator::validate(
            &body(json!({"code": "UK", "mail": "a@b.c", "level": "low"})),
            &schema
        )
        .is_ok());
        let errors = RequestValidator::validate(
            &body(json!({"code": "uk", "mail": "nope", "level": "mid"})),
            &schema,
        )
        .unwrap_err();
        let codes: Vec<_> = errors.iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![
                ValidationCode::ConstraintViolated,
                ValidationCode::InvalidFormat,
                ValidationCode::ConstraintViolated
            ]
        );
    }

    #[test]
    fn parse_key_checks_type() {
        let m = model();
        assert_eq!(
            RequestValidator::parse_key(&m, "17").unwrap(),
            vec![("id".to_string(), json!(17))]
        );
        let errors = RequestValidator::parse_key(&m, "abc").unwrap_err();
        assert_eq!(errors[0].field, "id");
        assert_eq!(errors[0].code, ValidationCode::InvalidType);
    }

    #[test]
    fn parse_composite_key() {
        let schema = SchemaDescriptor::new(vec![
            FieldSpec::string("region"),
            FieldSpec::integer("seq"),
            FieldSpec::string("note"),
        ]);
        let m = ResourceModel::builder("readings", schema)
            .primary_keys(["region", "seq"])
            .build()
            .unwrap();
        assert_eq!(
            RequestValidator::parse_key(&m, "eu,4").unwrap(),
            vec![("region".to_string(), json!("eu")), ("seq".to_string(), json!(4))]
        );
        assert!(RequestValidator::parse_key(&m, "eu").is_err());
        assert!(RequestValidator::parse_key(&m, "eu,x").is_err());
    }
}
