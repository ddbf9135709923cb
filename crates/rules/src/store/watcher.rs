//! Filesystem event handler for the store watcher (hot-reload).

use std::fs;
use std::path::Path;

use notify::event::{CreateKind, ModifyKind};
use notify::{Event, EventKind};
use tracing::{info, warn};

use planetmans_bus::{Message, RulesetBus, RulesetRuleChanged};
use planetmans_core::{Ruleset, RulesetId};

/// True for `.yml`/`.yaml` files that are not dotfiles (temp files and the
/// active marker are dotfiles).
pub(super) fn is_ruleset_file(path: &Path) -> bool {
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yml" || e == "yaml")
        .unwrap_or(false);
    let is_dotfile = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(true);
    is_yaml && !is_dotfile
}

/// Id encoded in a `ruleset-<id>.yml` file name.
pub(super) fn file_ruleset_id(path: &Path) -> Option<RulesetId> {
    if !is_ruleset_file(path) || path.extension().and_then(|e| e.to_str()) != Some("yml") {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix("ruleset-")?
        .parse()
        .ok()
}

/// Handle a single filesystem event from the notify watcher.
pub(super) fn handle_fs_event(event: &Event, bus: &RulesetBus) {
    let created = match &event.kind {
        EventKind::Create(CreateKind::File) => true,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Name(_)) => false,
        _ => return,
    };

    for path in event.paths.iter() {
        let Some(file_id) = file_ruleset_id(path) else {
            continue;
        };
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            // A rename's source path no longer exists.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read ruleset file during hot-reload");
                continue;
            }
        };

        match serde_yaml::from_str::<Ruleset>(&contents) {
            Ok(ruleset) if ruleset.id() != file_id => {
                warn!(
                    path = %path.display(),
                    file_id,
                    ruleset_id = ruleset.id(),
                    "ruleset id does not match file name, skipping"
                );
            }
            Ok(ruleset) => {
                info!(ruleset_id = ruleset.id(), path = %path.display(), "ruleset file changed");
                let event = if created {
                    RulesetRuleChanged::created(ruleset)
                } else {
                    RulesetRuleChanged::updated(ruleset)
                };
                bus.publish_now(Message::new(event));
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse ruleset during hot-reload, skipping"
                );
            }
        }
    }
}
