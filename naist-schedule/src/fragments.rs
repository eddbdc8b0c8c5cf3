use log::trace;

use crate::ParseError;

/// Inserted between text nodes while flattening a cell, so that layout
/// breaks can be told apart from punctuation inside a field.
pub(crate) const BREAK: &str = "[!tag]";

const IDEOGRAPHIC_SPACE: char = '\u{3000}';
const TEACHER_SEPARATOR: char = '、';
const ROUND_MARKER: &str = "＜第";

/// Fields recovered from the text of one schedule cell.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct CellText {
    pub title: String,
    pub classroom: String,
    pub teachers: Vec<String>,
    pub nth: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Leading,
    Title,
    Classroom,
    Details,
}

/// Flattens text nodes the way the page is laid out: joined on [`BREAK`],
/// trimmed as a whole, then split again.
pub(crate) fn segment<'a, I: IntoIterator<Item = &'a str>>(nodes: I) -> Vec<String> {
    let joined = nodes.into_iter().collect::<Vec<_>>().join(BREAK);
    joined.trim().split(BREAK).map(str::to_string).collect()
}

pub(crate) fn classify<S: AsRef<str>>(fragments: &[S]) -> Result<CellText, ParseError> {
    if fragments.len() < 3 {
        return Err(ParseError::TooFewFragments(fragments.len()));
    }

    let last = fragments.len() - 1;
    let mut state = State::Leading;
    let mut text = CellText::default();
    let mut teachers = String::new();

    for (idx, fragment) in fragments.iter().enumerate() {
        let fragment = fragment.as_ref();

        state = match state {
            State::Leading => State::Title,
            State::Title => {
                text.title = fragment.to_string();
                State::Classroom
            }
            State::Classroom => {
                text.classroom = fragment
                    .trim_start_matches(IDEOGRAPHIC_SPACE)
                    .trim_matches(|c| c == '[' || c == ']')
                    .to_string();
                State::Details
            }
            State::Details if idx == last => State::Details,
            State::Details => {
                if let Some(teacher) = fragment.strip_prefix(IDEOGRAPHIC_SPACE) {
                    teachers.push_str(teacher.trim_start_matches(IDEOGRAPHIC_SPACE));
                } else if fragment.starts_with(ROUND_MARKER) {
                    text.nth = Some(fragment.to_string());
                } else {
                    trace!("ignoring fragment {fragment:?}");
                }
                State::Details
            }
        };
    }

    text.teachers = split_teachers(&teachers);
    Ok(text)
}

/// Splits a `、`-separated teacher list into trimmed names. Full-width
/// spaces inside a name become ordinary spaces; blank entries are dropped.
#[must_use]
pub fn split_teachers(raw: &str) -> Vec<String> {
    raw.split(TEACHER_SEPARATOR)
        .map(|name| name.replace(IDEOGRAPHIC_SPACE, " ").trim_matches(' ').to_string())
        .filter(|name| !name.is_empty())
        .collect()
}
