//! Host tool availability checks.

use crate::config::Config;
use crate::process;

use super::types::CheckResult;

/// Check the tools the hooks shell out to.
///
/// `curl` and `pio` only matter when the recovery image comes from a URL or a
/// sibling project.
pub fn check_host_tools(config: &Config) -> Vec<CheckResult> {
    let mut results = vec![
        check_tool_exists("git", "git", "Required for version metadata", false),
        check_tool_exists(
            &config.esptool,
            "esptool",
            "Required to merge the factory image",
            true,
        ),
    ];

    if config.safeboot_file.is_none() && config.safeboot_project.is_some() {
        results.push(check_tool_exists(
            "pio",
            "platformio",
            "Required to build the recovery project",
            true,
        ));
    } else {
        results.push(CheckResult::skip("pio", "no recovery project configured"));
    }

    let uses_url = config.safeboot_file.is_none()
        && config.safeboot_project.is_none()
        && config.safeboot_url.is_some();
    if uses_url {
        results.push(check_tool_exists(
            "curl",
            "curl",
            "Required to download the recovery image",
            !config.safeboot_cache().exists(),
        ));
    } else {
        results.push(CheckResult::skip("curl", "no recovery download configured"));
    }

    results
}

/// Missing git only degrades the version string, so it is a warning.
fn check_tool_exists(tool: &str, package: &str, purpose: &str, required: bool) -> CheckResult {
    match process::which(tool) {
        Some(path) => CheckResult::pass_with(tool, &path),
        None => {
            let msg = format!("Not found. Install '{}'. {}", package, purpose);
            if required {
                CheckResult::fail(tool, &msg)
            } else {
                CheckResult::warn(tool, &msg)
            }
        }
    }
}
