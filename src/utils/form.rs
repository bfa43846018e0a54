use crate::api::error::{AppError, FieldError, collect_field_errors};
use crate::utils::multipart::MultipartForm;
use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use validator::Validate;

/// Typed reads over multipart text fields. Values that are present but do
/// not parse are recorded as field errors and reported together with the
/// `validator` rules in [`FieldReader::finish`].
pub struct FieldReader<'a> {
    form: &'a MultipartForm,
    errors: Vec<FieldError>,
}

impl<'a> FieldReader<'a> {
    pub fn new(form: &'a MultipartForm) -> Self {
        Self {
            form,
            errors: Vec::new(),
        }
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.form.text(name)
    }

    pub fn int(&mut self, name: &str) -> Option<i32> {
        let raw = self.form.text(name)?;
        match raw.parse::<i32>() {
            Ok(v) => Some(v),
            Err(_) => {
                self.errors.push(FieldError::new(
                    name,
                    "number",
                    format!("The '{}' field must be a number", name),
                ));
                None
            }
        }
    }

    pub fn date(&mut self, name: &str) -> Option<NaiveDate> {
        let raw = self.form.text(name)?;
        match parse_date(&raw) {
            Some(d) => Some(d),
            None => {
                self.errors.push(FieldError::new(
                    name,
                    "date",
                    format!("The '{}' field must be a date (YYYY-MM-DD)", name),
                ));
                None
            }
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        self.form.text(name).is_some_and(|v| parse_flag(&v))
    }

    /// Tag list as a JSON array; accepts repeated fields or one JSON array.
    pub fn tags(&mut self, name: &str) -> Option<Value> {
        let values = self.form.list(name);
        if values.is_empty() {
            return None;
        }
        let tags: Vec<String> = if values.len() == 1 && values[0].starts_with('[') {
            match serde_json::from_str(&values[0]) {
                Ok(tags) => tags,
                Err(_) => {
                    self.errors.push(FieldError::new(
                        name,
                        "array",
                        format!("The '{}' field must be an array of strings", name),
                    ));
                    return None;
                }
            }
        } else {
            values
        };
        Some(Value::from(tags))
    }

    pub fn push_error(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Runs the `validator` rules of `input` and merges them with parse
    /// errors. A field that failed to parse only reports the parse error.
    pub fn finish<T: Validate>(self, input: T) -> Result<T, AppError> {
        let mut errors = self.errors;
        if let Err(e) = input.validate() {
            let rule_errors: Vec<FieldError> = collect_field_errors(&e)
                .into_iter()
                .filter(|r| !errors.iter().any(|p| p.field == r.field))
                .collect();
            errors.extend(rule_errors);
        }

        if errors.is_empty() {
            Ok(input)
        } else {
            errors.sort_by(|a, b| a.field.cmp(&b.field));
            Err(AppError::Validation(errors))
        }
    }
}

/// `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
}

/// Checkbox-style values: `1`, `true`, `on`, `yes`, or any non-zero number.
pub fn parse_flag(raw: &str) -> bool {
    match raw.trim().to_lowercase().as_str() {
        "true" | "on" | "yes" => true,
        other => other.parse::<f64>().map(|n| n != 0.0).unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Input {
        #[validate(required(message = "users_id is required"))]
        users_id: Option<i32>,
        #[validate(required(message = "start_date is required"))]
        start_date: Option<NaiveDate>,
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2021-03-04"), NaiveDate::from_ymd_opt(2021, 3, 4));
        assert_eq!(
            parse_date("2021-03-04T10:00:00Z"),
            NaiveDate::from_ymd_opt(2021, 3, 4)
        );
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2021-13-01"), None);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("true"));
        assert!(parse_flag("ON"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_parse_error_replaces_required() {
        let mut form = MultipartForm::default();
        form.push_field("users_id", "abc".to_string());

        let mut reader = FieldReader::new(&form);
        let input = Input {
            users_id: reader.int("users_id"),
            start_date: reader.date("start_date"),
        };

        match reader.finish(input) {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].field, "start_date");
                assert_eq!(errors[0].kind, "required");
                assert_eq!(errors[1].field, "users_id");
                assert_eq!(errors[1].kind, "number");
            }
            other => panic!("expected validation error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_tags() {
        let mut form = MultipartForm::default();
        form.push_field("tags", r#"["rust", "sql"]"#.to_string());
        let mut reader = FieldReader::new(&form);
        assert_eq!(reader.tags("tags"), Some(serde_json::json!(["rust", "sql"])));
        assert_eq!(reader.tags("missing"), None);

        let mut form = MultipartForm::default();
        form.push_field("tags", "[not json".to_string());
        let mut reader = FieldReader::new(&form);
        assert_eq!(reader.tags("tags"), None);
        assert!(reader.finish(Input { users_id: Some(1), start_date: parse_date("2020-01-01") }).is_err());
    }
}
