//! What the host hands in for one call site: the resolved pattern text, where
//! its pieces live in the source file, and how the pattern is consumed.

use serde::{Deserialize, Serialize};

use crate::ast::{slice, Span};
use crate::flags::FlagSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceSpan {
    pub const fn new(start: SourcePosition, end: SourcePosition) -> Self {
        Self { start, end }
    }

    pub const fn on_line(line: u32, start_column: u32, end_column: u32) -> Self {
        Self {
            start: SourcePosition::new(line, start_column),
            end: SourcePosition::new(line, end_column),
        }
    }
}

/// One literal segment: `pattern_range` of the decoded text came from `source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanMapping {
    pub pattern_range: Span,
    pub source: SourceSpan,
}

/// Pattern text a call site was statically resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPattern {
    pub text: String,
    pub span_map: Vec<SpanMapping>,
}

impl ResolvedPattern {
    pub fn new(text: impl Into<String>, span_map: Vec<SpanMapping>) -> Self {
        Self {
            text: text.into(),
            span_map,
        }
    }

    /// A pattern written as one literal on `line`, its first character at `column`.
    pub fn single_line(text: impl Into<String>, line: u32, column: u32) -> Self {
        let text = text.into();
        let width = text.chars().count() as u32;
        let span_map = vec![SpanMapping {
            pattern_range: Span::new(0, text.len()),
            source: SourceSpan::on_line(line, column, column + width),
        }];
        Self { text, span_map }
    }

    /// A pattern built by concatenating literal segments at compile time.
    pub fn from_segments<'s>(segments: impl IntoIterator<Item = (&'s str, SourceSpan)>) -> Self {
        let mut text = String::new();
        let mut span_map = Vec::new();
        for (segment, source) in segments {
            let start = text.len();
            text.push_str(segment);
            span_map.push(SpanMapping {
                pattern_range: Span::new(start, text.len()),
                source,
            });
        }
        Self { text, span_map }
    }

    /// Source locations covering `span`; several when it crosses segments.
    pub fn map_span(&self, span: Span) -> Vec<SourceSpan> {
        if span.is_empty() {
            return self
                .span_map
                .iter()
                .find(|m| m.pattern_range.start <= span.start && span.start <= m.pattern_range.end)
                .map(|m| {
                    let projected = self.project(m, span);
                    let at_segment_end =
                        span.start == m.pattern_range.end && !m.pattern_range.is_empty();
                    let at = if at_segment_end { projected.end } else { projected.start };
                    vec![SourceSpan::new(at, at)]
                })
                .unwrap_or_default();
        }
        self.span_map
            .iter()
            .filter_map(|m| {
                let start = span.start.max(m.pattern_range.start);
                let end = span.end.min(m.pattern_range.end);
                (start < end).then(|| self.project(m, Span::new(start, end)))
            })
            .collect()
    }

    /// Column-precise when the segment is written one source column per
    /// decoded character; the whole segment otherwise.
    fn project(&self, mapping: &SpanMapping, part: Span) -> SourceSpan {
        let range = mapping.pattern_range;
        let source = mapping.source;
        let segment = slice(&self.text, range);
        let width = source.end.column.saturating_sub(source.start.column);
        let one_to_one =
            source.start.line == source.end.line && width as usize == segment.chars().count();
        if !one_to_one {
            return source;
        }
        let columns_before =
            slice(&self.text, Span::new(range.start, part.start)).chars().count() as u32;
        let columns = slice(&self.text, part).chars().count() as u32;
        let start = source.start.column + columns_before;
        SourceSpan::on_line(source.start.line, start, start + columns)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSource {
    Known(ResolvedPattern),
    /// The argument could not be determined statically.
    Unknown,
}

/// How a compiled pattern is used at its call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConsumptionMode {
    /// Searches for the first occurrence.
    FirstMatch,
    /// Must match the entire input.
    FullMatch,
    #[default]
    Unknown,
}

/// Everything the engine needs about one call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSite {
    pub source: PatternSource,
    pub flags: FlagSet,
    pub consumption: ConsumptionMode,
}

impl PatternSite {
    pub fn new(source: PatternSource, flags: FlagSet, consumption: ConsumptionMode) -> Self {
        Self {
            source,
            flags,
            consumption,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_maps_columns() {
        let pattern = ResolvedPattern::single_line("[0-9x9]", 3, 10);
        assert_eq!(
            pattern.map_span(Span::new(1, 4)),
            vec![SourceSpan::on_line(3, 11, 14)]
        );
    }

    #[test]
    fn span_across_segments() {
        let pattern = ResolvedPattern::from_segments([
            ("^a|", SourceSpan::on_line(1, 5, 8)),
            ("b$", SourceSpan::on_line(2, 9, 11)),
        ]);
        assert_eq!(pattern.text, "^a|b$");
        assert_eq!(
            pattern.map_span(Span::new(0, 5)),
            vec![SourceSpan::on_line(1, 5, 8), SourceSpan::on_line(2, 9, 11)]
        );
        assert_eq!(pattern.map_span(Span::new(3, 4)), vec![SourceSpan::on_line(2, 9, 10)]);
    }

    #[test]
    fn escaped_segment_maps_to_whole_literal() {
        // `"\\d+"` in source: four columns of quoted text, three decoded characters.
        let source = SourceSpan::on_line(1, 0, 4);
        let pattern = ResolvedPattern::from_segments([("\\d+", source)]);
        assert_eq!(pattern.map_span(Span::new(2, 3)), vec![source]);
    }

    #[test]
    fn empty_span_at_end_of_escaped_segment() {
        // `"\u0028"` in source: eight columns decoding to `(`.
        let pattern = ResolvedPattern::from_segments([("(", SourceSpan::on_line(1, 10, 18))]);
        assert_eq!(
            pattern.map_span(Span::empty_at(1)),
            vec![SourceSpan::on_line(1, 18, 18)]
        );
        assert_eq!(
            pattern.map_span(Span::empty_at(0)),
            vec![SourceSpan::on_line(1, 10, 10)]
        );
    }

    #[test]
    fn empty_span_at_end() {
        let pattern = ResolvedPattern::single_line("(", 1, 0);
        assert_eq!(
            pattern.map_span(Span::empty_at(1)),
            vec![SourceSpan::on_line(1, 1, 1)]
        );
    }
}
