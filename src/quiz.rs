use once_cell::sync::Lazy;
use regex::Regex;

/// Highest question number that keeps its answer options.
pub const LAST_MULTIPLE_CHOICE: u32 = 10;

static BLOCK_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid block separator regex"));
static QUESTION_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^(\d+)\.\s+(\S.*)").expect("valid question regex"));
static OPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-D])\)\s*(.*)$").expect("valid answer option regex"));

/// One numbered unit of quiz text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizBlock<'a> {
    pub index: u32,
    pub body: &'a str,
}

impl<'a> QuizBlock<'a> {
    /// Parses a trimmed block. Returns `None` unless it starts with
    /// `<digits>.`, whitespace and some text, and the digits fit in a `u32`.
    ///
    /// Multiple-choice text may begin on the line after the number. Practical
    /// questions are cut to their first line, so theirs must not.
    pub fn parse(block: &'a str) -> Option<Self> {
        let caps = QUESTION_START_RE.captures(block)?;
        let index = caps.get(1)?.as_str().parse::<u32>().ok()?;
        let text_start = caps.get(2)?.start();
        if index > LAST_MULTIPLE_CHOICE && block[..text_start].contains('\n') {
            return None;
        }
        Some(Self { index, body: block })
    }

    /// Question text after the `N.` prefix, options included.
    pub fn text(&self) -> &'a str {
        QUESTION_START_RE
            .captures(self.canonical())
            .and_then(|caps| caps.get(2))
            .map_or("", |m| m.as_str())
    }

    pub fn is_multiple_choice(&self) -> bool {
        self.index <= LAST_MULTIPLE_CHOICE
    }

    /// Multiple-choice blocks keep everything; the practical ones keep their
    /// first line only.
    pub fn canonical(&self) -> &'a str {
        if self.is_multiple_choice() {
            self.body
        } else {
            self.body.lines().next().unwrap_or_default().trim()
        }
    }
}

fn is_header_line(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn is_bold_only_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 4 && trimmed.starts_with("**") && trimmed.ends_with("**")
}

/// Reduces raw quiz output to numbered blocks separated by blank lines.
///
/// Markdown headers and lines that are entirely `**bold**` are removed, blocks
/// without a leading `N. ` are dropped, and questions past
/// [`LAST_MULTIPLE_CHOICE`] are cut to their first line.
pub fn clean_questions_text(text: &str) -> String {
    let filtered = text
        .lines()
        .filter(|line| !is_header_line(line) && !is_bold_only_line(line))
        .collect::<Vec<_>>()
        .join("\n");

    BLOCK_SEPARATOR_RE
        .split(filtered.trim())
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .filter_map(QuizBlock::parse)
        .map(|block| block.canonical())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub label: char,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizQuestion {
    MultipleChoice {
        number: u32,
        prompt: String,
        options: Vec<AnswerOption>,
    },
    Practical {
        number: u32,
        prompt: String,
    },
}

impl QuizQuestion {
    pub fn number(&self) -> u32 {
        match self {
            QuizQuestion::MultipleChoice { number, .. } | QuizQuestion::Practical { number, .. } => {
                *number
            }
        }
    }

    /// The question as shown to the user, including its `N.` prefix.
    pub fn title(&self) -> String {
        match self {
            QuizQuestion::MultipleChoice { number, prompt, .. }
            | QuizQuestion::Practical { number, prompt } => format!("{number}. {prompt}"),
        }
    }
}

/// Splits normalized quiz text into typed questions.
pub fn parse_quiz(text: &str) -> Vec<QuizQuestion> {
    BLOCK_SEPARATOR_RE
        .split(text.trim())
        .map(str::trim)
        .filter_map(QuizBlock::parse)
        .map(|block| question_from_block(&block))
        .collect()
}

fn question_from_block(block: &QuizBlock<'_>) -> QuizQuestion {
    let mut lines = block.text().lines();
    let prompt = lines.next().unwrap_or_default().trim().to_string();

    if !block.is_multiple_choice() {
        return QuizQuestion::Practical {
            number: block.index,
            prompt,
        };
    }

    let mut prompt_lines = vec![prompt];
    let mut options = Vec::new();
    for line in lines {
        let trimmed = line.trim();
        match OPTION_RE.captures(trimmed) {
            Some(caps) => {
                let label = caps[1].chars().next().unwrap_or('A');
                options.push(AnswerOption {
                    label,
                    text: caps[2].trim().to_string(),
                });
            }
            // Code snippets and wrapped text belong to the question itself.
            None => prompt_lines.push(line.to_string()),
        }
    }

    QuizQuestion::MultipleChoice {
        number: block.index,
        prompt: prompt_lines.join("\n"),
        options,
    }
}
