use anyhow::Result;
use serde::Serialize;
use std::io::Write;

/// Pretty-print any serializable value as JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    write_json(&mut stdout.lock(), value)
}

pub fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Page, PageContext};

    #[test]
    fn page_snapshot_serializes_filters_and_chrome() {
        let (page, _) = Page::load(PageContext::trials(), "status=overdue&q=aspirin");
        let mut buf = Vec::new();
        write_json(&mut buf, &page.snapshot()).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(v["view"], "trials");
        assert_eq!(v["filters"]["statuses"][0], "overdue");
        assert_eq!(v["chrome"]["search_box"], true);
        assert_eq!(v["chrome"]["pagination"], false);
    }
}
