//! Conversation scaffolding: the system prompt describing the reply grammar
//! and the opening user message carrying the task and project listing.

use serde::Serialize;

use crate::core::protocol::ProjectSnapshot;

/// Instructions that teach a model the command grammar the extractor reads.
pub const SYSTEM_PROMPT: &str = r#"You help modify and generate code inside an existing project. Reply only with the requests below:

1. ACCESS <path>: read a file. Its content comes back with 0-based line numbers.
2. REPLACE <start>-<end> <path>, then a fenced code block: the block replaces lines <start> through <end> inclusive.
3. CREATE <path>, then a fenced code block: propose a new file with that content.
4. DELETE <path>: propose deleting a file.
5. FOLLOWUP <text>: ask a question or leave a comment for the user.
6. COMPLETE: the task is done.

Given this file:

```
0  const foo = 2
1  const baz = 3
2  const bar = 4
```

changing baz to 4 looks like:

REPLACE 1-1 src/foo.ts
```
const baz = 4
```

To insert a line, repeat the line it follows, since the block replaces the whole range. To append, address the line after the last one:

REPLACE 3-3 src/foo.ts
```
const qux = 5
```

Read files before editing them. Only name paths from the folder structure you were given, except when creating a file. Wrap all code in triple backticks. Never apologize."#;

/// One chat message in the shape most completion APIs accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// First user message: the task followed by the fenced file listing.
pub fn initial_message(task: &str, snapshot: &ProjectSnapshot) -> String {
    let files = snapshot.iter().collect::<Vec<_>>().join("\n");
    format!("{task}\nBelow is my current folder structure:\n```\n{files}\n```")
}

/// System prompt plus opening message, ready to send.
pub fn conversation(task: &str, snapshot: &ProjectSnapshot) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system",
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: "user",
            content: initial_message(task, snapshot),
        },
    ]
}
