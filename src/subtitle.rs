use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TIME_RANGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{2}:\d{2}:\d{2},\d{3}\s*-->\s*\d{2}:\d{2}:\d{2},\d{3}$")
        .expect("time range pattern is valid")
});

/// One subtitle block. `index` and `time_range` are carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedRecord {
    pub index: String,
    pub time_range: String,
    pub text: String,
}

/// Parsed records plus the number of non-blank lines that belonged to no block
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub records: Vec<TimedRecord>,
    pub skipped_lines: usize,
}

fn is_index_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit())
}

fn is_time_range_line(line: &str) -> bool {
    TIME_RANGE_REGEX.is_match(line.trim())
}

/// Parse raw subtitle text into ordered records. Malformed blocks are skipped;
/// an empty result means the input could not be parsed at all.
pub fn parse(content: &str) -> Vec<TimedRecord> {
    parse_with_report(content).records
}

pub fn parse_with_report(content: &str) -> ParseReport {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let lines: Vec<&str> = content.lines().collect();

    let mut report = ParseReport::default();
    let mut i = 0;

    while i < lines.len() {
        let starts_block = is_index_line(lines[i])
            && i + 1 < lines.len()
            && is_time_range_line(lines[i + 1]);

        if !starts_block {
            if !lines[i].trim().is_empty() {
                report.skipped_lines += 1;
            }
            i += 1;
            continue;
        }

        // Text runs until the next index line or end of input
        let text_start = i + 2;
        let mut end = text_start;
        while end < lines.len() && !is_index_line(lines[end]) {
            end += 1;
        }

        report.records.push(TimedRecord {
            index: lines[i].trim().to_string(),
            time_range: lines[i + 1].trim().to_string(),
            text: lines[text_start..end].join("\n").trim().to_string(),
        });
        i = end;
    }

    report
}

/// Reassemble translated batches into subtitle text. Output stops at whichever
/// of `records` or the flattened translations is shorter.
pub fn rebuild<S: AsRef<str>>(records: &[TimedRecord], translated_batches: &[Vec<S>]) -> String {
    let flat: Vec<&str> = translated_batches
        .iter()
        .flat_map(|batch| batch.iter().map(|t| t.as_ref()))
        .collect();
    rebuild_flat(records, &flat)
}

pub fn rebuild_flat<S: AsRef<str>>(records: &[TimedRecord], translations: &[S]) -> String {
    records
        .iter()
        .zip(translations.iter())
        .map(|(record, text)| format!("{}\n{}\n{}\n", record.index, record.time_range, text.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:01,000 --> 00:00:02,500\nHello there.\n\n2\n00:00:03,000 --> 00:00:04,000\nFirst line\nSecond line\n\n3\n00:00:05,000 --> 00:00:06,000\nBye.\n";

    #[test]
    fn test_parse_well_formed() {
        let records = parse(SAMPLE);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].index, "1");
        assert_eq!(records[0].time_range, "00:00:01,000 --> 00:00:02,500");
        assert_eq!(records[0].text, "Hello there.");
        assert_eq!(records[1].text, "First line\nSecond line");
        assert_eq!(records[2].text, "Bye.");
    }

    #[test]
    fn test_parse_keeps_blank_lines_inside_text() {
        let content = "1\n00:00:01,000 --> 00:00:02,000\nTop\n\nBottom\n\n2\n00:00:03,000 --> 00:00:04,000\nNext\n";
        let records = parse(content);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "Top\n\nBottom");
    }

    #[test]
    fn test_parse_handles_crlf_and_bom() {
        let content = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,000\r\nHi\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nYo\r\n";
        let records = parse(content);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].index, "1");
        assert_eq!(records[1].text, "Yo");
    }

    #[test]
    fn test_parse_skips_malformed_blocks() {
        let content = "garbage header\n\n1\nnot a time\nText\n\n2\n00:00:03,000 --> 00:00:04,000\nKept\n";
        let report = parse_with_report(content);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].index, "2");
        assert_eq!(report.records[0].text, "Kept");
        assert!(report.skipped_lines >= 3);
    }

    #[test]
    fn test_parse_empty_and_unrelated_input() {
        assert!(parse("").is_empty());
        assert!(parse("just some prose\nwith no timing").is_empty());
    }

    #[test]
    fn test_rebuild_round_trip() {
        let records = parse(SAMPLE);
        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let rebuilt = rebuild(&records, &[texts]);

        let reparsed = parse(&rebuilt);
        assert_eq!(reparsed, records);
        assert!(rebuilt.starts_with("1\n00:00:01,000 --> 00:00:02,500\nHello there.\n\n2\n"));
    }

    #[test]
    fn test_rebuild_flattens_batches_in_order() {
        let records = parse(SAMPLE);
        let batches = vec![
            vec!["A".to_string(), "B".to_string()],
            vec!["C".to_string()],
        ];
        let rebuilt = rebuild(&records, &batches);
        let texts: Vec<String> = parse(&rebuilt).into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_rebuild_stops_at_shorter_translation() {
        let records = parse(SAMPLE);
        let rebuilt = rebuild_flat(&records, &["Only one"]);
        assert_eq!(rebuilt, "1\n00:00:01,000 --> 00:00:02,500\nOnly one\n");
    }
}
