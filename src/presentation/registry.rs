//! Command registry and dispatcher
//!
//! The command tree is static data. Dispatch turns argv into either an
//! `Invocation` of one leaf or a request for help on some path; it never
//! fails. Flags from the whole tree share one namespace and may appear
//! anywhere in argv, so `secret set --stage=prod Foo bar` and
//! `--stage=prod secret set Foo bar` resolve the same way.

use std::collections::{BTreeMap, HashSet};

use clap::parser::ValueSource;
use clap::{value_parser, Arg, ArgAction};
use serde::Serialize;
use thiserror::Error;

use super::context::CommandContext;

/// Name clap uses internally for the catch-all positional argument
const POSITIONALS: &str = "__positionals";

pub type Handler = fn(&mut CommandContext) -> anyhow::Result<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagKind {
    String,
    Bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FlagValue {
    String(String),
    Bool(bool),
}

impl FlagValue {
    pub fn kind(&self) -> FlagKind {
        match self {
            FlagValue::String(_) => FlagKind::String,
            FlagValue::Bool(_) => FlagKind::Bool,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Description {
    pub short: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Argument {
    pub name: &'static str,
    pub required: bool,
    pub description: Description,
}

impl Argument {
    pub fn required(name: &'static str, short: &'static str) -> Self {
        Self {
            name,
            required: true,
            description: Description { short, long: None },
        }
    }

    pub fn optional(name: &'static str, short: &'static str) -> Self {
        Self {
            name,
            required: false,
            description: Description { short, long: None },
        }
    }

    /// `<name>` or `[name]`
    pub fn usage(&self) -> String {
        if self.required {
            format!("<{}>", self.name)
        } else {
            format!("[{}]", self.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flag {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: FlagKind,
    pub description: Description,
}

impl Flag {
    pub fn string(name: &'static str, short: &'static str) -> Self {
        Self {
            name,
            kind: FlagKind::String,
            description: Description { short, long: None },
        }
    }

    pub fn bool(name: &'static str, short: &'static str) -> Self {
        Self {
            name,
            kind: FlagKind::Bool,
            description: Description { short, long: None },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Example {
    pub content: &'static str,
    pub description: Description,
}

#[derive(Clone, Serialize)]
pub struct Command {
    pub name: &'static str,
    pub hidden: bool,
    pub description: Description,
    #[serde(rename = "args")]
    pub arguments: Vec<Argument>,
    pub flags: Vec<Flag>,
    pub examples: Vec<Example>,
    pub children: Vec<Command>,
    #[serde(skip)]
    pub handler: Option<Handler>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("hidden", &self.hidden)
            .field("arguments", &self.arguments)
            .field("flags", &self.flags)
            .field("children", &self.children)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

impl Command {
    pub fn new(name: &'static str, short: &'static str) -> Self {
        Self {
            name,
            hidden: false,
            description: Description { short, long: None },
            arguments: Vec::new(),
            flags: Vec::new(),
            examples: Vec::new(),
            children: Vec::new(),
            handler: None,
        }
    }

    pub fn long(mut self, long: &'static str) -> Self {
        self.description.long = Some(long);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn arg(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn flag(mut self, flag: Flag) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn example(mut self, content: &'static str, short: &'static str) -> Self {
        self.examples.push(Example {
            content,
            description: Description { short, long: None },
        });
        self
    }

    pub fn child(mut self, child: Command) -> Self {
        self.children.push(child);
        self
    }

    pub fn handler(mut self, handler: Handler) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn find_child(&self, name: &str) -> Option<&Command> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn visible_children(&self) -> impl Iterator<Item = &Command> {
        self.children.iter().filter(|c| !c.hidden)
    }

    pub fn required_arguments(&self) -> usize {
        self.arguments.iter().filter(|a| a.required).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("command '{parent}' has two children named '{name}'")]
    DuplicateChild { parent: String, name: String },

    #[error("command '{path}' has both a handler and subcommands")]
    HandlerWithChildren { path: String },

    #[error("flag '--{name}' is declared as both string and bool")]
    ConflictingFlag { name: String },

    #[error("command name '{name}' is not a plain word")]
    InvalidName { name: String },
}

/// A resolved leaf and its parsed input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub path: Vec<&'static str>,
    pub flags: BTreeMap<&'static str, FlagValue>,
    pub positionals: Vec<String>,
}

impl Invocation {
    /// String flag value, if given
    pub fn string(&self, name: &str) -> Option<&str> {
        match self.flags.get(name) {
            Some(FlagValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Bool flag value; absent means `false`
    pub fn bool(&self, name: &str) -> bool {
        matches!(self.flags.get(name), Some(FlagValue::Bool(true)))
    }

    /// Positional by index, or `""` when absent
    pub fn positional(&self, index: usize) -> &str {
        self.positionals.get(index).map(String::as_str).unwrap_or("")
    }

    /// Full command name, e.g. `secret set`
    pub fn command_name(&self) -> String {
        self.path[1..].join(" ")
    }
}

/// Outcome of dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Run(Invocation),
    /// Show help for the command at this path (root first)
    Help {
        path: Vec<&'static str>,
        flags: BTreeMap<&'static str, FlagValue>,
    },
}

/// Validated command tree
#[derive(Debug, Clone)]
pub struct Registry {
    root: Command,
    flag_kinds: BTreeMap<&'static str, FlagKind>,
}

impl Registry {
    pub fn new(root: Command) -> Result<Self, RegistryError> {
        let mut flag_kinds = BTreeMap::new();
        validate(&root, root.name, &mut flag_kinds)?;
        Ok(Self { root, flag_kinds })
    }

    pub fn root(&self) -> &Command {
        &self.root
    }

    /// Command nodes along `path`, root first. `None` if any segment is unknown.
    pub fn lineage(&self, path: &[&str]) -> Option<Vec<&Command>> {
        let (first, rest) = path.split_first()?;
        if *first != self.root.name {
            return None;
        }
        let mut nodes = vec![&self.root];
        let mut current = &self.root;
        for segment in rest {
            current = current.find_child(segment)?;
            nodes.push(current);
        }
        Some(nodes)
    }

    pub fn find(&self, path: &[&str]) -> Option<&Command> {
        self.lineage(path).and_then(|nodes| nodes.last().copied())
    }

    /// Resolve argv (without the program name)
    pub fn dispatch<I, S>(&self, args: I) -> Dispatch
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();

        let matches = match self.parser().try_get_matches_from(&args) {
            Ok(matches) => matches,
            Err(err) => {
                tracing::debug!(error = %err, "argument parsing failed, showing help");
                let words = args.iter().filter(|a| !a.starts_with('-')).cloned();
                let (path, _) = self.walk(words.collect());
                return Dispatch::Help {
                    path,
                    flags: BTreeMap::new(),
                };
            }
        };

        let mut flags = BTreeMap::new();
        for (&name, &kind) in &self.flag_kinds {
            if matches.value_source(name) != Some(ValueSource::CommandLine) {
                continue;
            }
            let value = match kind {
                FlagKind::String => matches
                    .get_one::<String>(name)
                    .map(|v| FlagValue::String(v.clone())),
                FlagKind::Bool => matches.get_one::<bool>(name).map(|v| FlagValue::Bool(*v)),
            };
            if let Some(value) = value {
                flags.insert(name, value);
            }
        }

        let words: Vec<String> = matches
            .get_many::<String>(POSITIONALS)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        let (path, positionals) = self.walk(words);

        let wants_help = matches!(flags.get("help"), Some(FlagValue::Bool(true)));
        let runnable = self
            .find(&path)
            .is_some_and(|cmd| cmd.handler.is_some() && positionals.len() >= cmd.required_arguments());
        if wants_help || !runnable {
            return Dispatch::Help { path, flags };
        }

        Dispatch::Run(Invocation {
            path,
            flags,
            positionals,
        })
    }

    /// Descend while the next word names a child; the rest are positionals
    fn walk(&self, words: Vec<String>) -> (Vec<&'static str>, Vec<String>) {
        let mut path = vec![self.root.name];
        let mut current = &self.root;
        let mut rest = words.into_iter().peekable();
        while let Some(word) = rest.peek() {
            match current.find_child(word) {
                Some(child) => {
                    path.push(child.name);
                    current = child;
                    rest.next();
                }
                None => break,
            }
        }
        (path, rest.collect())
    }

    fn parser(&self) -> clap::Command {
        let mut cmd = clap::Command::new(self.root.name)
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .disable_help_subcommand(true)
            .args_override_self(true)
            .arg(
                Arg::new(POSITIONALS)
                    .num_args(0..)
                    .action(ArgAction::Append)
                    .value_parser(value_parser!(String)),
            );
        for (&name, &kind) in &self.flag_kinds {
            let arg = Arg::new(name).long(name).action(ArgAction::Set);
            let arg = match kind {
                FlagKind::String => arg.num_args(1).value_parser(value_parser!(String)),
                FlagKind::Bool => arg
                    .num_args(0..=1)
                    .require_equals(true)
                    .default_missing_value("true")
                    .value_parser(value_parser!(bool)),
            };
            cmd = cmd.arg(arg);
        }
        cmd
    }
}

fn validate(
    cmd: &Command,
    path: &str,
    flag_kinds: &mut BTreeMap<&'static str, FlagKind>,
) -> Result<(), RegistryError> {
    let plain = |name: &str| {
        !name.is_empty()
            && !name.starts_with('-')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    };
    if !plain(cmd.name) {
        return Err(RegistryError::InvalidName {
            name: cmd.name.to_string(),
        });
    }
    if cmd.handler.is_some() && !cmd.children.is_empty() {
        return Err(RegistryError::HandlerWithChildren {
            path: path.to_string(),
        });
    }
    for flag in &cmd.flags {
        if !plain(flag.name) || flag.name == POSITIONALS {
            return Err(RegistryError::InvalidName {
                name: flag.name.to_string(),
            });
        }
        match flag_kinds.get(flag.name) {
            Some(kind) if *kind != flag.kind => {
                return Err(RegistryError::ConflictingFlag {
                    name: flag.name.to_string(),
                })
            }
            _ => {
                flag_kinds.insert(flag.name, flag.kind);
            }
        }
    }

    let mut seen = HashSet::new();
    for child in &cmd.children {
        if !seen.insert(child.name) {
            return Err(RegistryError::DuplicateChild {
                parent: path.to_string(),
                name: child.name.to_string(),
            });
        }
        validate(child, &format!("{} {}", path, child.name), flag_kinds)?;
    }
    Ok(())
}
