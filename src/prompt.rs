//! Prompt construction for command generation.
//!
//! The system text is fixed; the few-shot examples at its end are what the
//! backend generalizes from, so keep every category covered when editing.

use crate::execution_context::GenerationRequest;

/// The two halves of a completion prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

const SYSTEM_INSTRUCTIONS: &str = r#"You are a senior Unix systems engineer. Turn each natural-language request into one precise shell command.

OUTPUT RULES:
1. Reply with the shell command only. No prose, no comments, no markdown fences.
2. Keep the command short without making it cryptic.
3. Use relative paths unless the request asks for absolute ones.
4. Never emit placeholders such as <file>; pick a sensible concrete value instead.
5. Prefer POSIX-portable commands and the most widely available flags.
6. Use ls for plain listings and find for searches with conditions.
7. Make sure pipes, redirects and separators are syntactically valid.

SAFETY AND QUOTING:
1. Destructive operations must ask first: use rm -i, mv -i and cp -i.
2. Quote filenames and variables so spaces and special characters survive.
3. Use shell expansions for user-specific values ($HOME, $(whoami), $(pwd)).
4. Prefer human-readable sizes (-h) where the tool supports them.
5. Escape regex metacharacters (. * $ [ ] ^) with a backslash in grep and sed patterns.
6. Add sudo only when the operation cannot work without it.
7. Handle the obvious failure case with a fallback such as || echo "Not found".

BACKGROUND:
- Hidden files are files whose names start with a dot.
- * matches any run of characters, ? matches exactly one.
- . is the current directory, .. its parent, ~ the home directory.

EXAMPLES:

Listing and finding files
Request: list all files
Command: ls -la

Request: list hidden files
Command: ls -d .*

Request: find python files changed in the last 3 days
Command: find . -name "*.py" -type f -mtime -3

Request: rename every txt file to md
Command: for f in *.txt; do mv -i "$f" "${f%.txt}.md"; done

Searching and replacing content
Request: count error lines in the system log
Command: grep -i error /var/log/syslog | wc -l

Request: replace foo with bar in all python files
Command: find . -name "*.py" -exec sed -i 's/foo/bar/g' {} \;

Request: find lines containing a literal dot-com
Command: grep -n '\.com' *.txt

Sizes and disk usage
Request: show the ten largest entries here
Command: du -sh * | sort -hr | head -10

Request: find files bigger than 100MB
Command: find . -type f -size +100M

Request: how full are my disks
Command: df -h

Networking
Request: check if port 8080 is open
Command: nc -zv localhost 8080 2>&1 || echo "Port closed"

Request: show which process listens on port 3000
Command: lsof -i :3000

Archives
Request: compress the logs folder into a tar.gz
Command: tar -czf logs.tar.gz logs/

Request: unpack archive.tar.gz
Command: tar -xzf archive.tar.gz

Text processing
Request: sort data.csv by the second column numerically
Command: sort -t, -k2,2n data.csv

Request: list unique IP addresses in access.log
Command: grep -oE '([0-9]{1,3}\.){3}[0-9]{1,3}' access.log | sort -u
"#;

/// Builds the system and user text for one request.
///
/// Deterministic: the same request always yields the same prompt.
pub fn build(request: &GenerationRequest) -> Prompt {
    let user = format!(
        "Convert this request into a shell command:\n\n\
         Request: {}\n\n\
         Context:\n\
         - Operating System: {}\n\
         - Current Directory: {}\n\n\
         Command:",
        request.query.as_str(),
        request.context.os_name,
        request.context.cwd,
    );

    Prompt {
        system: SYSTEM_INSTRUCTIONS.to_string(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution_context::{ExecutionContext, Query};

    fn request(query: &str) -> GenerationRequest {
        GenerationRequest::new(
            Query::parse(query).unwrap(),
            ExecutionContext::new("linux", "/home/me/project"),
        )
    }

    #[test]
    fn test_user_text_interpolates_query_and_context() {
        let prompt = build(&request("find mp3 files"));

        assert!(prompt.user.contains("Request: find mp3 files"));
        assert!(prompt.user.contains("Operating System: linux"));
        assert!(prompt.user.contains("Current Directory: /home/me/project"));
    }

    #[test]
    fn test_build_is_deterministic() {
        assert_eq!(build(&request("list files")), build(&request("list files")));
    }

    #[test]
    fn test_system_text_is_independent_of_query() {
        assert_eq!(build(&request("a")).system, build(&request("b")).system);
    }

    #[test]
    fn test_system_text_covers_rules() {
        let system = build(&request("x")).system;

        assert!(system.contains("shell command only"));
        assert!(system.contains("POSIX"));
        assert!(system.contains("rm -i"));
        assert!(system.contains("Quote filenames"));
        assert!(system.contains("Escape regex metacharacters"));
    }

    #[test]
    fn test_system_text_covers_example_categories() {
        let system = build(&request("x")).system;

        for command in ["ls -la", "sed -i", "du -sh", "nc -zv", "tar -czf", "sort -t,"] {
            assert!(system.contains(command), "missing example using {command}");
        }
    }
}
