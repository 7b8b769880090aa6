//! `depresi check`: a plain-text report of how each categorical column is encoded.

use depresi_ai::EncodingPolicy;
use depresi_ai::policy::ColumnEncoding;

/// One line per categorical column, in schema order.
pub fn render(policy: &EncodingPolicy) -> String {
    let width = policy.columns().map(|(c, _)| c.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (column, encoding) in policy.columns() {
        let detail = match encoding {
            ColumnEncoding::Fitted(encoder) => format!("{} classes", encoder.classes().len()),
            ColumnEncoding::Fallback(_) => "built-in rule".to_string(),
        };
        out.push_str(&format!(
            "{column:<width$}  {:<8}  {detail}\n",
            encoding.tier().as_str()
        ));
    }
    out
}
