use anyhow::Result;
use serde::Serialize;

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::render_json;
    use crate::analysis::SeatCategory;

    #[test]
    fn renders_categories_as_slugs() {
        let out = render_json(&[SeatCategory::Safe, SeatCategory::TossUp]).unwrap();
        assert!(out.contains("\"safe\""));
        assert!(out.contains("\"toss_up\""));
    }
}
