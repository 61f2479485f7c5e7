//! Build description parser.
//!
//! A build description is line oriented. Each directive line has the form
//!
//! ```text
//! filebuild "src/main.cpp", 'include/main.h'
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. A line counts as a
//! directive only when a name is followed by a comma-separated list of quoted
//! arguments; anything after the list is ignored. Other lines, including
//! unknown directive names, are dropped. A known directive with the wrong
//! number of arguments, or an empty one, is an error naming the line.

use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::build_config::{BuildConfig, FileRule};
use crate::core::errors::OmakeError;

static DIRECTIVE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(\w+)\s+((?:"[^"]*"|'[^']*')(?:\s*,\s*(?:"[^"]*"|'[^']*'))*)"#).unwrap()
});

static ARGUMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)"|'([^']*)'"#).unwrap());

/// Directives understood by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// `filebuild "src" [, "header"]`
    FileBuild,
    /// `buildfile "name"`
    BuildFile,
    /// `buildcode "compiler"`
    BuildCode,
    /// `buildmake "tool"`
    BuildMake,
    /// `building "flag"`
    Building,
}

impl Directive {
    /// Look up a directive by its exact, case-sensitive name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "filebuild" => Some(Directive::FileBuild),
            "buildfile" => Some(Directive::BuildFile),
            "buildcode" => Some(Directive::BuildCode),
            "buildmake" => Some(Directive::BuildMake),
            "building" => Some(Directive::Building),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Directive::FileBuild => "filebuild",
            Directive::BuildFile => "buildfile",
            Directive::BuildCode => "buildcode",
            Directive::BuildMake => "buildmake",
            Directive::Building => "building",
        }
    }

    /// Accepted number of arguments.
    fn arity(&self) -> RangeInclusive<usize> {
        match self {
            Directive::FileBuild => 1..=2,
            _ => 1..=1,
        }
    }
}

/// Parse a build description starting from the default configuration.
pub fn parse(text: &str) -> Result<BuildConfig, OmakeError> {
    parse_with_base(text, BuildConfig::default())
}

/// Parse a build description file.
pub fn parse_file(path: &Path, base: BuildConfig) -> Result<BuildConfig, OmakeError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| OmakeError::io("read build description", path, e))?;
    parse_with_base(&text, base)
}

/// Parse a build description on top of `base`.
///
/// `base` carries values decided before parsing: configured defaults and
/// CL mode. While `base.use_cl_build` is set, `buildcode` is ignored.
pub fn parse_with_base(text: &str, base: BuildConfig) -> Result<BuildConfig, OmakeError> {
    let mut config = base;

    for (idx, line) in text.lines().enumerate() {
        let line_num = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some(caps) = DIRECTIVE_LINE.captures(line) else {
            tracing::debug!("line {}: ignoring unrecognized line", line_num);
            continue;
        };

        let name = &caps[1];
        let Some(directive) = Directive::from_name(name) else {
            tracing::debug!("line {}: ignoring unknown directive `{}`", line_num, name);
            continue;
        };

        let mut args = split_arguments(&caps[2]);
        if args.iter().any(String::is_empty) {
            return Err(OmakeError::Parse {
                line: line_num,
                message: format!("`{}`: empty argument", directive.as_str()),
            });
        }

        let arity = directive.arity();
        if !arity.contains(&args.len()) {
            let expected = if arity.start() == arity.end() {
                format!("{}", arity.start())
            } else {
                format!("{} or {}", arity.start(), arity.end())
            };
            return Err(OmakeError::Parse {
                line: line_num,
                message: format!(
                    "`{}` expects {} quoted argument(s), found {}",
                    directive.as_str(),
                    expected,
                    args.len()
                ),
            });
        }

        let first = args.remove(0);
        match directive {
            Directive::FileBuild => {
                let rule = FileRule {
                    source: first,
                    header: args.pop(),
                };
                config.file_rules.push(rule);
            }
            Directive::BuildFile => config.output_name = first,
            Directive::BuildCode => {
                if config.use_cl_build {
                    tracing::debug!("line {}: CL mode active, ignoring `buildcode`", line_num);
                } else {
                    config.compiler = first;
                }
            }
            Directive::BuildMake => config.make_tool = first,
            Directive::Building => config.build_options.push(first),
        }
    }

    if config.file_rules.is_empty() {
        return Err(OmakeError::NoSources);
    }

    Ok(config)
}

/// Pull the quoted arguments out of a matched argument list.
fn split_arguments(list: &str) -> Vec<String> {
    ARGUMENT
        .captures_iter(list)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}
