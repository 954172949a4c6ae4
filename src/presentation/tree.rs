//! The stagehand command tree

use super::registry::{Argument, Command, Flag, Registry, RegistryError};
use crate::commands;

pub const PROGRAM: &str = "stagehand";

pub fn registry() -> Result<Registry, RegistryError> {
    Registry::new(root())
}

pub fn root() -> Command {
    Command::new(PROGRAM, "Deploy and manage your app's stages.")
        .long(
            "Deploy and manage your app's stages.\n\n\
             Every command runs against one stage of the app. Without --stage, \
             your personal stage is used.",
        )
        .flag(Flag::string("stage", "The stage to operate on"))
        .flag(Flag::bool("verbose", "Print debug logs to stderr"))
        .flag(Flag::bool("help", "Show help for a command"))
        .child(
            Command::new("deploy", "Deploy the app to a stage")
                .example("stagehand deploy --stage=production", "Deploy to production")
                .handler(commands::stack::cmd_deploy),
        )
        .child(
            Command::new("remove", "Remove every resource of a stage")
                .example("stagehand remove --stage=pr-42", "Tear down a preview stage")
                .handler(commands::stack::cmd_remove),
        )
        .child(
            Command::new("refresh", "Sync the state with deployed resources")
                .hidden()
                .handler(commands::stack::cmd_refresh),
        )
        .child(
            Command::new("unlock", "Release a stuck lock on a stage")
                .long(
                    "Release a stuck lock on a stage.\n\n\
                     Use this when a deploy was interrupted and left the stage locked. \
                     It does not stop a deploy that is still running elsewhere.",
                )
                .handler(commands::stack::cmd_unlock),
        )
        .child(
            Command::new("state", "Manage the state of a stage")
                .hidden()
                .child(
                    Command::new("edit", "Edit the state in your editor")
                        .hidden()
                        .handler(commands::state::cmd_state_edit),
                ),
        )
        .child(
            Command::new("secret", "Manage the secrets of a stage")
                .child(
                    Command::new("set", "Set a secret")
                        .long(
                            "Set a secret for the stage. Secrets are stored in the home \
                             provider and shared by everyone deploying the stage.",
                        )
                        .arg(Argument::required("name", "Name of the secret"))
                        .arg(Argument::required("value", "Value to store"))
                        .example(
                            "stagehand secret set STRIPE_KEY sk_test_123",
                            "Set a secret for your personal stage",
                        )
                        .handler(commands::secret::cmd_secret_set),
                )
                .child(
                    Command::new("remove", "Remove a secret")
                        .arg(Argument::required("name", "Name of the secret"))
                        .handler(commands::secret::cmd_secret_remove),
                )
                .child(
                    Command::new("list", "List the secrets of a stage")
                        .handler(commands::secret::cmd_secret_list),
                ),
        )
        .child(
            Command::new("shell", "Run a command with linked resources in its environment")
                .arg(Argument::optional("command", "Command to run; defaults to sh"))
                .example("stagehand shell node scripts/seed.js", "Seed a database")
                .handler(commands::shell::cmd_shell),
        )
        .child(
            Command::new("dev", "Start or attach to the dev session")
                .long(
                    "Start or attach to the dev session.\n\n\
                     The first `dev` in a project deploys and redeploys on file \
                     changes. Further invocations attach and show its progress. \
                     An extra command is run with linked resources in its environment.",
                )
                .arg(Argument::optional("command", "Command to run alongside"))
                .example("stagehand dev npm run start", "Run your app next to the session")
                .handler(commands::dev::cmd_dev),
        )
        .child(
            Command::new("server", "Run the coordination server in the foreground")
                .hidden()
                .handler(commands::dev::cmd_server),
        )
        .child(
            Command::new("import-unstable", "Adopt an existing resource into the state")
                .hidden()
                .arg(Argument::required("type", "Resource type"))
                .arg(Argument::required("name", "Name in the state"))
                .arg(Argument::required("id", "Provider id of the resource"))
                .flag(Flag::string("parent", "Parent resource name"))
                .handler(commands::import::cmd_import),
        )
        .child(Command::new("version", "Print the version").handler(commands::info::cmd_version))
        .child(
            Command::new("introspect", "Print the command tree as JSON")
                .hidden()
                .handler(commands::info::cmd_introspect),
        )
}
