/// Renders a result the way it is shown on screen and stored in history.
///
/// Uses the shortest decimal that round-trips, so `-27.0` prints as `-27`
/// and `0.1 + 0.2` as `0.30000000000000004`.
pub fn format_number(x: f64) -> String {
    if x.is_nan() {
        "nan".to_string()
    } else if x.is_infinite() {
        let sign = if x > 0.0 { "" } else { "-" };
        format!("{}inf", sign)
    } else if x == 0.0 {
        // collapses -0
        "0".to_string()
    } else {
        x.to_string()
    }
}

pub fn format_record(expression: &str, result: f64) -> String {
    format!("{} = {}", expression, format_number(result))
}
