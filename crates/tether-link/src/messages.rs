// ABOUTME: Operator-facing text printed while linking
// ABOUTME: Banners, prompts, and the re-run hint shown after a failed code

use colored::Colorize;
use shell_escape::escape;
use std::ffi::OsStr;

pub const DISCOVERY_INTRO: &str = "
Now open the mobile or web app. If your phone or computer is connected to the
same network as your printer, you will see this printer listed in the app. Click
\"Link Now\" and you will be all set!

Waiting for the app to link this printer automatically...  press 'Enter' if you
want to link your printer using a 6-digit verification code instead.
";

pub const SWITCH_PROMPT: &str =
    "\nSwitch to using 6-digit verification code to link printer? [Y/n] ";

pub const CONTINUE_WAITING: &str = "Continue waiting...";

pub const SWITCHED_TO_MANUAL: &str =
    "\n### Switched to using 6-digit verification code to link printer. ###";

pub const MANUAL_INTRO: &str = "
To link to your account, you need to obtain the 6-digit verification code
in the mobile or web app, and enter the code below.
";

pub const CODE_PROMPT: &str = "Enter verification code: ";

/// Shown when the config already holds a token. Linking continues regardless.
pub fn already_linked_warning() -> String {
    "
!!!WARNING: This printer is already linked!
Proceed only if you want to re-link your printer to another account.

To abort, press Ctrl-C.
"
    .red()
    .to_string()
}

pub fn linked_banner() -> String {
    "\n###### Successfully linked to your account!"
        .green()
        .bold()
        .to_string()
}

pub fn failed_banner() -> String {
    "\n==== Failed to link. Did you enter an expired code? ====\n"
        .red()
        .to_string()
}

pub fn rerun_hint(command: &str) -> String {
    command.cyan().to_string()
}

pub fn code_file_missing(path: &std::path::Path) -> String {
    format!("error: no 6 digit code found at {}", path.display())
        .red()
        .to_string()
}

/// Rebuilds the current invocation with the debug flag appended.
///
/// Arguments that are not valid UTF-8 are shown lossily; the hint is for a human to copy.
pub fn rerun_command<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut parts: Vec<String> = args
        .into_iter()
        .map(|a| escape(a.as_ref().to_string_lossy()).into_owned())
        .collect();
    if parts.is_empty() {
        parts.push(env!("CARGO_PKG_NAME").to_string());
    }
    if !parts.iter().skip(1).any(|a| a == "-d" || a == "--debug") {
        parts.push("-d".to_string());
    }
    parts.join(" ")
}
