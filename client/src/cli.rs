//! Line commands understood by the `listsync` binary.

use listsync_engine::ShoppingList;

/// Help text printed by the `help` command.
pub const HELP: &str = "\
Commands:
  add <name>: <item>, <item>, ...   create a list
  show                              print the current lists
  json                              print the current lists as JSON
  online | offline                  switch connectivity (manual mode only)
  status                            print mode and connectivity
  help                              show this text
  quit                              exit";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Add { name: String, items: Vec<String> },
    Show,
    Json,
    Online,
    Offline,
    Status,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Input::Empty,
            "add" => parse_add(rest),
            "show" | "ls" => Input::Show,
            "json" => Input::Json,
            "online" => Input::Online,
            "offline" => Input::Offline,
            "status" => Input::Status,
            "help" | "?" => Input::Help,
            "quit" | "exit" => Input::Quit,
            _ => Input::Unknown(line.to_string()),
        }
    }

    /// Build the list an `add` command describes.
    pub fn into_list(self, owner_id: &str) -> Option<ShoppingList> {
        match self {
            Input::Add { name, items } => Some(ShoppingList::new(owner_id, name, items)),
            _ => None,
        }
    }
}

/// `<name>: a, b, c` - blank items are skipped.
fn parse_add(rest: &str) -> Input {
    let (name, items) = match rest.split_once(':') {
        Some((name, items)) => (name, items),
        None => (rest, ""),
    };

    let items = items
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect();

    Input::Add {
        name: name.trim().to_string(),
        items,
    }
}
