//! Workspace (`.sln`) parser.
//!
//! The format is line-oriented, so parsing is a small state machine over
//! trimmed lines. Only the two structured line kinds, project declarations and
//! global-section headers, go through a [`chumsky`] grammar:
//!
//! ```text
//! Project("{TYPE-ID}") = "Name", "Relative\Path.vcxproj", "{PROJECT-ID}"
//! GlobalSection(SectionName) = preSolution
//! ```
//!
//! Everything else (version banners, project bodies, unknown lines) is
//! skipped.

use chumsky::prelude::*;
use tracing::debug;

use crate::error::{Error, Result};
use crate::workspace::{GlobalSection, GlobalSectionEntry};

/// A `Project(...)` line, with braces stripped from both ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDeclaration {
    pub type_id: String,
    pub name: String,
    pub path: String,
    pub id: String,
}

/// Everything the parser collects, in declaration order.
#[derive(Debug, Default)]
pub struct ParsedWorkspace {
    pub projects: Vec<ProjectDeclaration>,
    pub sections: Vec<GlobalSection>,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Line grammars
// ═══════════════════════════════════════════════════════════════════════════════

type LineErr<'a> = extra::Err<Simple<'a, char>>;

/// `"text"`, yielding `text`.
fn quoted<'a>() -> impl Parser<'a, &'a str, &'a str, LineErr<'a>> {
    just('"')
        .ignore_then(none_of('"').repeated().to_slice())
        .then_ignore(just('"'))
}

/// `"{ID}"`, yielding `ID`.
fn quoted_id<'a>() -> impl Parser<'a, &'a str, &'a str, LineErr<'a>> {
    just("\"{")
        .ignore_then(none_of('}').repeated().at_least(1).to_slice())
        .then_ignore(just("}\""))
}

fn project_line<'a>() -> impl Parser<'a, &'a str, ProjectDeclaration, LineErr<'a>> {
    just("Project(")
        .ignore_then(quoted_id())
        .then_ignore(just(')'))
        .then_ignore(just('=').padded())
        .then(quoted())
        .then_ignore(just(',').padded())
        .then(quoted())
        .then_ignore(just(',').padded())
        .then(quoted_id())
        .map(|(((type_id, name), path), id)| ProjectDeclaration {
            type_id: type_id.to_string(),
            name: name.to_string(),
            path: path.to_string(),
            id: id.to_string(),
        })
}

fn section_header<'a>() -> impl Parser<'a, &'a str, (&'a str, &'a str), LineErr<'a>> {
    just("GlobalSection(")
        .ignore_then(none_of(')').repeated().at_least(1).to_slice())
        .then_ignore(just(')'))
        .then_ignore(just('=').padded())
        .then(any().repeated().at_least(1).to_slice())
}

fn syntax_error<'a>(
    line: usize,
    what: &str,
    errs: impl IntoIterator<Item = Simple<'a, char>>,
) -> Error {
    let details: Vec<String> = errs.into_iter().map(|e| format!("{e}")).collect();
    Error::WorkspaceSyntax {
        line,
        message: format!("unexpected {what} syntax: {}", details.join("; ")),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  State machine
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
enum State {
    Top,
    SkippingProjectBody,
    InGlobal,
    InGlobalSection(GlobalSection),
}

#[derive(Debug, Default)]
struct WorkspaceParser {
    parsed: ParsedWorkspace,
}

impl WorkspaceParser {
    fn top(&mut self, line: &str, number: usize) -> Result<State> {
        if line.is_empty() || line.starts_with('#') {
            return Ok(State::Top);
        }
        if line.starts_with("Project(") {
            let project = project_line()
                .parse(line)
                .into_result()
                .map_err(|errs| syntax_error(number, "project", errs))?;
            debug!(name = %project.name, id = %project.id, "adding project");
            self.parsed.projects.push(project);
            return Ok(State::SkippingProjectBody);
        }
        if line == "Global" {
            return Ok(State::InGlobal);
        }
        Ok(State::Top)
    }

    fn skip_project_body(&mut self, line: &str) -> State {
        if line == "EndProject" {
            State::Top
        } else {
            State::SkippingProjectBody
        }
    }

    fn in_global(&mut self, line: &str, number: usize) -> Result<State> {
        if line == "EndGlobal" {
            return Ok(State::Top);
        }
        if line.starts_with("GlobalSection(") {
            let (name, step) = section_header()
                .parse(line)
                .into_result()
                .map_err(|errs| syntax_error(number, "global section", errs))?;
            debug!(name, "adding global section");
            return Ok(State::InGlobalSection(GlobalSection::new(name, step)));
        }
        Ok(State::InGlobal)
    }

    fn in_global_section(
        &mut self,
        mut section: GlobalSection,
        line: &str,
        number: usize,
    ) -> Result<State> {
        if line == "EndGlobalSection" {
            self.parsed.sections.push(section);
            return Ok(State::InGlobal);
        }
        if line.is_empty() {
            return Ok(State::InGlobalSection(section));
        }
        let Some((name, value)) = line.split_once('=') else {
            return Err(Error::WorkspaceSyntax {
                line: number,
                message: format!("expected 'name = value' in section {}", section.name),
            });
        };
        section.entries.push(GlobalSectionEntry {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
        });
        Ok(State::InGlobalSection(section))
    }

    fn finish(mut self, state: State) -> ParsedWorkspace {
        match state {
            State::InGlobalSection(section) => {
                debug!(name = %section.name, "unterminated global section");
                self.parsed.sections.push(section);
            }
            State::SkippingProjectBody => debug!("unterminated project body"),
            State::InGlobal => debug!("unterminated global block"),
            State::Top => {}
        }
        self.parsed
    }
}

/// Parse the text of a workspace file.
///
/// Line numbers in [`Error::WorkspaceSyntax`] are 1-based.
pub fn parse_workspace(text: &str) -> Result<ParsedWorkspace> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut parser = WorkspaceParser::default();
    let mut state = State::Top;

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        let number = index + 1;
        state = match state {
            State::Top => parser.top(line, number)?,
            State::SkippingProjectBody => parser.skip_project_body(line),
            State::InGlobal => parser.in_global(line, number)?,
            State::InGlobalSection(section) => parser.in_global_section(section, line, number)?,
        };
    }

    Ok(parser.finish(state))
}
