//! Editor languages and their starter templates.
//!
//! A session's shared buffer is seeded with the template of the selected
//! language the first time it is observed empty after the initial sync.

use crate::shared::error::SharedError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Languages offered by the session editor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Python,
    JavaScript,
    TypeScript,
    Java,
    Cpp,
}

impl Language {
    /// All supported languages
    pub const ALL: [Language; 5] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Java,
        Language::Cpp,
    ];

    /// Identifier used on the wire and by the execution service
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Java => "java",
            Language::Cpp => "cpp",
        }
    }

    /// Starter code written into an empty shared buffer
    pub fn template(&self) -> &'static str {
        match self {
            Language::Python => {
                "def solution():\n    # write your solution here\n    pass\n\n# test cases run against solution()\n"
            }
            Language::JavaScript => {
                "function solution(nums) {\n    // write your solution here\n}\n\n// test cases run against solution()\n"
            }
            Language::TypeScript => {
                "export function solution(nums: number[]): any {\n  // write your solution here\n}\n"
            }
            Language::Java => {
                "public class Solution {\n    public void solution() {\n        // write your solution here\n    }\n}\n"
            }
            Language::Cpp => {
                "#include <iostream>\n#include <vector>\nusing namespace std;\n\nvoid solution() {\n    // write your solution here\n}\n\nint main() {\n    solution();\n    return 0;\n}\n"
            }
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" => Ok(Language::JavaScript),
            "typescript" | "ts" => Ok(Language::TypeScript),
            "java" => Ok(Language::Java),
            "cpp" | "c++" => Ok(Language::Cpp),
            other => Err(SharedError::validation(
                "language",
                format!("unsupported language '{}'", other),
            )),
        }
    }
}
