use crate::diagnostic::{Diagnostic, err};
use crate::duration::RuleDuration;
use crate::error::ValidatorError;
use crate::record::{Record, is_truthy, type_name};
use crate::tables::sentinel::MAX_QUERY_PERIOD_MINUTES;
use crate::validator::{LintContext, Validator};

/// `queryFrequency` and `queryPeriod` formats and how they relate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimingValidator;

impl Validator for TimingValidator {
    fn name(&self) -> &'static str {
        "Timing Validator"
    }

    fn id(&self) -> &'static str {
        "timing"
    }

    fn validate(
        &self,
        record: &Record,
        _ctx: &LintContext<'_>,
    ) -> Result<Vec<Diagnostic>, ValidatorError> {
        let mut diagnostics = Vec::new();

        let frequency = parse_field(record, "queryFrequency", &mut diagnostics);
        let period = parse_field(record, "queryPeriod", &mut diagnostics);

        if let (Some((freq_text, freq)), Some((period_text, period))) = (&frequency, &period)
            && freq.minutes() > period.minutes()
        {
            diagnostics.push(err(
                format!(
                    "queryFrequency '{freq_text}' ({} minutes) cannot exceed \
                     queryPeriod '{period_text}' ({} minutes)",
                    freq.minutes(),
                    period.minutes()
                ),
                "queryFrequency",
            ));
        }

        if let Some((period_text, period)) = &period
            && period.minutes() > MAX_QUERY_PERIOD_MINUTES
        {
            diagnostics.push(err(
                format!(
                    "queryPeriod '{period_text}' ({} minutes) exceeds maximum of 14 days \
                     ({MAX_QUERY_PERIOD_MINUTES} minutes)",
                    period.minutes()
                ),
                "queryPeriod",
            ));
        }

        Ok(diagnostics)
    }
}

/// Parse one duration field. Unset fields yield `None` silently; malformed
/// ones yield `None` plus an error.
fn parse_field<'a>(
    record: &'a Record,
    field: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<(&'a str, RuleDuration)> {
    let value = record.get(field).filter(|v| is_truthy(v))?;
    let Some(text) = value.as_str() else {
        diagnostics.push(err(
            format!("Field '{field}' must be a string, got {}", type_name(value)),
            field,
        ));
        return None;
    };
    match text.parse::<RuleDuration>() {
        Ok(d) => Some((text, d)),
        Err(_) => {
            diagnostics.push(err(
                format!(
                    "Field '{field}' has invalid format: '{text}'. Expected format: \
                     <number><unit> where unit is 'm' (minutes), 'h' (hours), or 'd' (days). \
                     Examples: '5m', '1h', '2d'"
                ),
                field,
            ));
            None
        }
    }
}
