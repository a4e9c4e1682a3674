/// Format an amount as whole Indian Rupees with lakh/crore digit grouping,
/// e.g. `11143500.0` becomes `₹1,11,43,500`.
pub fn format_rupee(amount: f64) -> String {
    if !amount.is_finite() {
        return "₹NaN".to_string();
    }
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let grouped = group_indian(&digits);
    if negative {
        format!("-₹{grouped}")
    } else {
        format!("₹{grouped}")
    }
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}
