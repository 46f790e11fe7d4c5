//! Report rendering for completed walks.
//!
//! Each answer record renders as a YAML 1.1 block mapping with sorted keys,
//! emitted the way PyYAML's `yaml.dump(record, default_flow_style=False)`
//! does. Reports already on file were written that way. Text that a YAML 1.1
//! reader would resolve to another type (`Yes`, `off`, `12`, `~`, dates) is
//! quoted. Multi-line text is single-quoted with doubled line breaks, and text
//! outside printable ASCII is double-quoted with escapes. Long values fold at
//! 80 columns. Blocks are joined with `"\n\n"`; since every block ends in a
//! newline, records are separated by two empty lines.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::tree::{Attributes, Scalar};

/// Separator placed between serialized records.
pub const BLOCK_SEPARATOR: &str = "\n\n";

const BEST_WIDTH: usize = 80;
const INDENT: usize = 2;

/// Plain scalars that YAML 1.1 resolves to bool, null, int, float, merge,
/// value or timestamp rather than string.
static IMPLICIT_NON_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:",
        r"yes|Yes|YES|no|No|NO|true|True|TRUE|false|False|FALSE|on|On|ON|off|Off|OFF",
        r"|~|null|Null|NULL|<<|=",
        r"|[-+]?0b[0-1_]+|[-+]?0[0-7_]+|[-+]?(?:0|[1-9][0-9_]*)|[-+]?0x[0-9a-fA-F_]+",
        r"|[-+]?[1-9][0-9_]*(?::[0-5]?[0-9])+",
        r"|[-+]?[0-9][0-9_]*\.[0-9_]*(?:[eE][-+][0-9]+)?|\.[0-9_]+(?:[eE][-+][0-9]+)?",
        r"|[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+\.[0-9_]*|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN)",
        r"|[0-9]{4}-[0-9]{2}-[0-9]{2}",
        r"|[0-9]{4}-[0-9]{1,2}-[0-9]{1,2}(?:[Tt]|[ \t]+)[0-9]{1,2}:[0-9]{2}:[0-9]{2}",
        r"(?:\.[0-9]*)?(?:[ \t]*(?:Z|[-+][0-9]{1,2}(?::[0-9]{2})?))?",
        r")$"
    ))
    .expect("implicit scalar pattern is valid")
});

/// Serialize answer records in visitation order.
pub fn serialize(records: &[Attributes]) -> String {
    records
        .iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

fn render_block(record: &Attributes) -> String {
    let mut emitter = Emitter::default();
    for (key, value) in record {
        emitter.text(key, Position::Key);
        emitter.write(":");
        match value {
            Scalar::Text(text) => emitter.text(text, Position::Value),
            other => {
                emitter.write(" ");
                emitter.write(&render_non_text(other));
            }
        }
        emitter.line_break();
    }
    emitter.out
}

fn render_non_text(value: &Scalar) -> String {
    match value {
        Scalar::Bool(true) => "true".to_string(),
        Scalar::Bool(false) => "false".to_string(),
        Scalar::Int(value) => value.to_string(),
        Scalar::Float(value) => render_float(*value),
        Scalar::Text(text) => text.clone(),
    }
}

/// Python `repr` of a float, with `.0` forced into exponent forms.
fn render_float(value: f64) -> String {
    if value.is_nan() {
        return ".nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { ".inf" } else { "-.inf" }.to_string();
    }
    let scientific = format!("{value:e}");
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if (-4..16).contains(&exponent) {
        let fixed = value.to_string();
        if fixed.contains('.') {
            fixed
        } else {
            format!("{fixed}.0")
        }
    } else {
        let mantissa = if mantissa.contains('.') {
            mantissa.to_string()
        } else {
            format!("{mantissa}.0")
        };
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Position {
    Key,
    Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Style {
    Plain,
    SingleQuoted,
    DoubleQuoted,
}

#[derive(Debug)]
struct Analysis {
    empty: bool,
    multiline: bool,
    allow_plain: bool,
    allow_single_quoted: bool,
}

fn is_break(ch: char) -> bool {
    matches!(ch, '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

fn is_blank_or_break(ch: char) -> bool {
    matches!(ch, '\0' | ' ' | '\t' | '\r') || is_break(ch)
}

fn is_printable_ascii(ch: char) -> bool {
    (' '..='~').contains(&ch)
}

fn analyze(text: &[char]) -> Analysis {
    if text.is_empty() {
        return Analysis {
            empty: true,
            multiline: false,
            allow_plain: true,
            allow_single_quoted: true,
        };
    }

    let mut block_indicators = false;
    let mut line_breaks = false;
    let mut special_characters = false;
    let mut leading_space = false;
    let mut leading_break = false;
    let mut trailing_space = false;
    let mut trailing_break = false;
    let mut break_space = false;
    let mut space_break = false;

    let starts_with = |prefix: &str| text.iter().copied().take(3).eq(prefix.chars());
    if starts_with("---") || starts_with("...") {
        block_indicators = true;
    }

    let last = text.len() - 1;
    let mut preceded_by_whitespace = true;
    let mut followed_by_whitespace = text.len() == 1 || is_blank_or_break(text[1]);
    let mut previous_space = false;
    let mut previous_break = false;

    for (index, &ch) in text.iter().enumerate() {
        if index == 0 {
            if "#,[]{}&*!|>'\"%@`".contains(ch) || (ch == '-' && followed_by_whitespace) {
                block_indicators = true;
            }
            if "?:".contains(ch) && followed_by_whitespace {
                block_indicators = true;
            }
        } else if (ch == ':' && followed_by_whitespace) || (ch == '#' && preceded_by_whitespace) {
            block_indicators = true;
        }

        if is_break(ch) {
            line_breaks = true;
        }
        if !(ch == '\n' || is_printable_ascii(ch)) {
            special_characters = true;
        }

        if ch == ' ' {
            leading_space |= index == 0;
            trailing_space |= index == last;
            break_space |= previous_break;
            previous_space = true;
            previous_break = false;
        } else if is_break(ch) {
            leading_break |= index == 0;
            trailing_break |= index == last;
            space_break |= previous_space;
            previous_space = false;
            previous_break = true;
        } else {
            previous_space = false;
            previous_break = false;
        }

        preceded_by_whitespace = is_blank_or_break(ch);
        followed_by_whitespace = index + 2 >= text.len() || is_blank_or_break(text[index + 2]);
    }

    let mut analysis = Analysis {
        empty: false,
        multiline: line_breaks,
        allow_plain: true,
        allow_single_quoted: true,
    };
    if leading_space || leading_break || trailing_space || trailing_break {
        analysis.allow_plain = false;
    }
    if break_space {
        analysis.allow_plain = false;
        analysis.allow_single_quoted = false;
    }
    if space_break || special_characters {
        analysis.allow_plain = false;
        analysis.allow_single_quoted = false;
    }
    if line_breaks || block_indicators {
        analysis.allow_plain = false;
    }
    analysis
}

fn choose_style(text: &str, chars: &[char], position: Position) -> Style {
    let analysis = analyze(chars);
    let simple_key = position == Position::Key;
    let resolves_to_text = !text.is_empty() && !IMPLICIT_NON_TEXT.is_match(text);
    if resolves_to_text
        && analysis.allow_plain
        && !(simple_key && (analysis.empty || analysis.multiline))
    {
        return Style::Plain;
    }
    if analysis.allow_single_quoted && !(simple_key && analysis.multiline) {
        return Style::SingleQuoted;
    }
    Style::DoubleQuoted
}

fn escape(ch: char) -> String {
    let short = match ch {
        '\0' => Some('0'),
        '\u{07}' => Some('a'),
        '\u{08}' => Some('b'),
        '\t' => Some('t'),
        '\n' => Some('n'),
        '\u{0B}' => Some('v'),
        '\u{0C}' => Some('f'),
        '\r' => Some('r'),
        '\u{1B}' => Some('e'),
        '"' => Some('"'),
        '\\' => Some('\\'),
        '\u{85}' => Some('N'),
        '\u{A0}' => Some('_'),
        '\u{2028}' => Some('L'),
        '\u{2029}' => Some('P'),
        _ => None,
    };
    match short {
        Some(code) => format!("\\{code}"),
        None if u32::from(ch) <= 0xFF => format!("\\x{:02X}", u32::from(ch)),
        None if u32::from(ch) <= 0xFFFF => format!("\\u{:04X}", u32::from(ch)),
        None => format!("\\U{:08X}", u32::from(ch)),
    }
}

fn needs_escape(ch: char) -> bool {
    matches!(ch, '"' | '\\' | '\u{85}' | '\u{2028}' | '\u{2029}' | '\u{FEFF}')
        || !is_printable_ascii(ch)
}

/// Line writer tracking the current column for folding.
#[derive(Debug, Default)]
struct Emitter {
    out: String,
    column: usize,
}

impl Emitter {
    fn write(&mut self, data: &str) {
        self.column += data.chars().count();
        self.out.push_str(data);
    }

    fn write_chars(&mut self, data: &[char]) {
        self.column += data.len();
        self.out.extend(data);
    }

    fn line_break(&mut self) {
        self.out.push('\n');
        self.column = 0;
    }

    fn indent(&mut self) {
        if self.column > INDENT {
            self.line_break();
        }
        while self.column < INDENT {
            self.write(" ");
        }
    }

    fn text(&mut self, text: &str, position: Position) {
        let chars: Vec<char> = text.chars().collect();
        if position == Position::Value {
            self.write(" ");
        }
        // Keys never fold.
        let split = position == Position::Value;
        match choose_style(text, &chars, position) {
            Style::Plain => self.plain(&chars, split),
            Style::SingleQuoted => self.single_quoted(&chars, split),
            Style::DoubleQuoted => self.double_quoted(&chars, split),
        }
    }

    fn plain(&mut self, text: &[char], split: bool) {
        let mut spaces = false;
        let mut start = 0;
        for end in 0..=text.len() {
            let ch = text.get(end).copied();
            if spaces {
                if ch != Some(' ') {
                    if start + 1 == end && self.column > BEST_WIDTH && split {
                        self.indent();
                    } else {
                        self.write_chars(&text[start..end]);
                    }
                    start = end;
                }
            } else if ch.is_none_or(|ch| ch == ' ') {
                self.write_chars(&text[start..end]);
                start = end;
            }
            if let Some(ch) = ch {
                spaces = ch == ' ';
            }
        }
    }

    fn single_quoted(&mut self, text: &[char], split: bool) {
        self.write("'");
        let mut spaces = false;
        let mut breaks = false;
        let mut start = 0;
        for end in 0..=text.len() {
            let ch = text.get(end).copied();
            if spaces {
                if ch != Some(' ') {
                    if start + 1 == end
                        && self.column > BEST_WIDTH
                        && split
                        && start != 0
                        && end != text.len()
                    {
                        self.indent();
                    } else {
                        self.write_chars(&text[start..end]);
                    }
                    start = end;
                }
            } else if breaks {
                if !ch.is_some_and(is_break) {
                    if text[start] == '\n' {
                        self.line_break();
                    }
                    for &br in &text[start..end] {
                        self.out.push(br);
                        self.column = 0;
                    }
                    self.indent();
                    start = end;
                }
            } else if ch.is_none_or(|ch| ch == ' ' || ch == '\'' || is_break(ch)) && start < end {
                self.write_chars(&text[start..end]);
                start = end;
            }
            if ch == Some('\'') {
                self.write("''");
                start = end + 1;
            }
            if let Some(ch) = ch {
                spaces = ch == ' ';
                breaks = is_break(ch);
            }
        }
        self.write("'");
    }

    fn double_quoted(&mut self, text: &[char], split: bool) {
        self.write("\"");
        let mut start = 0;
        for end in 0..=text.len() {
            let ch = text.get(end).copied();
            if ch.is_none_or(needs_escape) {
                if start < end {
                    self.write_chars(&text[start..end]);
                    start = end;
                }
                if let Some(ch) = ch {
                    self.write(&escape(ch));
                    start = end + 1;
                }
            }
            let pending = end as isize - start as isize;
            if 0 < end
                && end + 1 < text.len()
                && (ch == Some(' ') || start >= end)
                && self.column as isize + pending > BEST_WIDTH as isize
                && split
            {
                if start < end {
                    self.write_chars(&text[start..end]);
                    start = end;
                }
                self.write("\\");
                self.indent();
                if text[start] == ' ' {
                    self.write("\\");
                }
            }
        }
        self.write("\"");
    }
}

/// A completed report: the records and their rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    records: Vec<Attributes>,
    text: String,
}

impl Report {
    pub fn from_records(records: Vec<Attributes>) -> Self {
        let text = serialize(&records);
        Self { records, text }
    }

    pub fn records(&self) -> &[Attributes] {
        &self.records
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Scalar)]) -> Attributes {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    fn reload(rendered: &str) -> serde_yaml::Mapping {
        serde_yaml::from_str(rendered).expect("report block is valid yaml")
    }

    #[test]
    fn serialize_sorts_keys_and_separates_blocks() {
        let records = vec![
            record(&[
                ("text", Scalar::from("pick")),
                ("selected_option", Scalar::from("A")),
            ]),
            record(&[("text", Scalar::from("end"))]),
        ];
        let rendered = serialize(&records);
        assert_eq!(rendered, "selected_option: A\ntext: pick\n\n\ntext: end\n");
    }

    #[test]
    fn serialize_keeps_scalar_types() {
        let records = vec![record(&[
            ("escalate", Scalar::Bool(true)),
            ("priority", Scalar::Int(2)),
            ("score", Scalar::Float(0.5)),
            ("weight", Scalar::Float(2.0)),
        ])];
        let rendered = serialize(&records);
        assert_eq!(
            rendered,
            "escalate: true\npriority: 2\nscore: 0.5\nweight: 2.0\n"
        );
    }

    #[test]
    fn text_that_resolves_to_another_type_is_quoted() {
        let records = vec![record(&[
            ("a", Scalar::from("yes")),
            ("b", Scalar::from("12")),
            ("c", Scalar::Float(2.0)),
            ("d", Scalar::from("~")),
            ("e", Scalar::from("2024-03-01")),
            ("f", Scalar::from("12:30")),
            ("selected_option", Scalar::from("Yes")),
        ])];
        assert_eq!(
            serialize(&records),
            "a: 'yes'\nb: '12'\nc: 2.0\nd: '~'\ne: '2024-03-01'\nf: '12:30'\n\
             selected_option: 'Yes'\n"
        );
    }

    #[test]
    fn multiline_text_is_single_quoted_with_doubled_breaks() {
        let records = vec![record(&[("response", Scalar::from("line one\nline two"))])];
        let rendered = serialize(&records);
        assert_eq!(rendered, "response: 'line one\n\n  line two'\n");
        assert_eq!(
            reload(&rendered)["response"].as_str(),
            Some("line one\nline two")
        );
    }

    #[test]
    fn indicators_and_quotes_force_single_quotes() {
        let records = vec![record(&[
            ("a", Scalar::from("- item")),
            ("b", Scalar::from("#tag")),
            ("c", Scalar::from("key: value")),
            ("d", Scalar::from("'quoted'")),
            ("e", Scalar::from("don't panic")),
            ("f", Scalar::from("trailing ")),
        ])];
        assert_eq!(
            serialize(&records),
            "a: '- item'\nb: '#tag'\nc: 'key: value'\nd: '''quoted'''\ne: don't panic\n\
             f: 'trailing '\n"
        );
    }

    #[test]
    fn non_ascii_text_is_double_quoted_with_escapes() {
        let records = vec![record(&[
            ("note", Scalar::from("café")),
            ("tab", Scalar::from("a\tb")),
        ])];
        let rendered = serialize(&records);
        assert_eq!(rendered, "note: \"caf\\xE9\"\ntab: \"a\\tb\"\n");
        let reloaded = reload(&rendered);
        assert_eq!(reloaded["note"].as_str(), Some("café"));
        assert_eq!(reloaded["tab"].as_str(), Some("a\tb"));
    }

    #[test]
    fn long_plain_text_folds_at_eighty_columns() {
        let text = ["alpha"; 20].join(" ");
        let records = vec![record(&[("text", Scalar::from(text.as_str()))])];
        let rendered = serialize(&records);
        let expected = format!(
            "text: {}\n  {}\n",
            ["alpha"; 13].join(" "),
            ["alpha"; 7].join(" ")
        );
        assert_eq!(rendered, expected);
        assert_eq!(reload(&rendered)["text"].as_str(), Some(text.as_str()));
    }

    #[test]
    fn floats_follow_python_repr() {
        assert_eq!(render_float(2.0), "2.0");
        assert_eq!(render_float(123.456), "123.456");
        assert_eq!(render_float(0.0001), "0.0001");
        assert_eq!(render_float(1e15), "1000000000000000.0");
        assert_eq!(render_float(1e16), "1.0e+16");
        assert_eq!(render_float(1.5e-5), "1.5e-05");
        assert_eq!(render_float(-0.0), "-0.0");
    }

    #[test]
    fn serialize_is_deterministic() {
        let records = vec![record(&[
            ("b", Scalar::from("beta")),
            ("a", Scalar::from("alpha")),
            ("c", Scalar::from("gamma")),
        ])];
        let first = serialize(&records);
        let second = serialize(&records);
        assert_eq!(first, second);
        assert!(first.starts_with("a: "));
    }

    #[test]
    fn empty_record_list_renders_empty_report() {
        let report = Report::from_records(Vec::new());
        assert_eq!(report.as_str(), "");
        assert!(report.records().is_empty());
    }
}
