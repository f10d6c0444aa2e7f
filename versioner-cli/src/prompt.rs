//! Interactive choices. Every method returns `None` (or `false`) when the user
//! cancels, which callers turn into an early, successful exit.

use std::io::{self, BufRead, IsTerminal, Write};

pub trait Prompter: Send {
    /// Pick one of `options`; returns its index.
    fn choose(&mut self, prompt: &str, options: &[String]) -> Option<usize>;

    /// Pick any number of `options`; `preselected` is kept on empty input.
    fn choose_many(&mut self, prompt: &str, options: &[String], preselected: &[usize]) -> Option<Vec<usize>>;

    fn confirm(&mut self, prompt: &str) -> bool;

    /// Free text; empty input yields `default` (or an empty string).
    fn input(&mut self, prompt: &str, default: Option<&str>) -> Option<String>;

    /// Text that must not be echoed, such as a password.
    fn input_secret(&mut self, prompt: &str) -> Option<String>;

    /// Whether a person is answering; optional questions are skipped otherwise.
    fn is_interactive(&self) -> bool;
}

const MAX_ATTEMPTS: usize = 3;

/// Line-based prompts over any reader/writer pair
pub struct ConsolePrompter<R, W> {
    input: R,
    output: W,
    // Secrets go through the terminal with echo off
    tty: bool,
}

impl ConsolePrompter<io::BufReader<io::Stdin>, io::Stdout> {
    pub fn stdio() -> Self {
        let tty = io::stdin().is_terminal();
        Self {
            tty,
            ..Self::new(io::BufReader::new(io::stdin()), io::stdout())
        }
    }
}

impl<R: BufRead, W: Write> ConsolePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            tty: false,
        }
    }

    /// Next trimmed line, `None` on end of input or a bare `q`.
    fn read_line(&mut self) -> Option<String> {
        let _ = self.output.flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let line = line.trim().to_string();
                (line != "q").then_some(line)
            }
        }
    }

    fn print_options(&mut self, prompt: &str, options: &[String], marked: &[usize]) {
        let _ = writeln!(self.output, "{prompt}");
        for (i, option) in options.iter().enumerate() {
            let mark = if marked.contains(&i) { "*" } else { " " };
            let _ = writeln!(self.output, " {mark}{:>2}) {option}", i + 1);
        }
    }
}

fn parse_index(raw: &str, len: usize) -> Option<usize> {
    raw.parse::<usize>()
        .ok()
        .filter(|n| (1..=len).contains(n))
        .map(|n| n - 1)
}

impl<R: BufRead + Send, W: Write + Send> Prompter for ConsolePrompter<R, W> {
    fn choose(&mut self, prompt: &str, options: &[String]) -> Option<usize> {
        if options.is_empty() {
            return None;
        }
        self.print_options(prompt, options, &[]);

        for _ in 0..MAX_ATTEMPTS {
            let _ = write!(self.output, "Choice [1-{}, q to cancel]: ", options.len());
            let line = self.read_line()?;
            if let Some(index) = parse_index(&line, options.len()) {
                return Some(index);
            }
            let _ = writeln!(self.output, "Invalid choice: {line}");
        }
        None
    }

    fn choose_many(&mut self, prompt: &str, options: &[String], preselected: &[usize]) -> Option<Vec<usize>> {
        if options.is_empty() {
            return None;
        }
        self.print_options(prompt, options, preselected);

        for _ in 0..MAX_ATTEMPTS {
            let _ = write!(self.output, "Numbers separated by commas [q to cancel]: ");
            let line = self.read_line()?;
            if line.is_empty() {
                return Some(preselected.to_vec());
            }

            let picked: Option<Vec<usize>> = line
                .split(',')
                .map(|part| parse_index(part.trim(), options.len()))
                .collect();

            match picked {
                Some(mut indices) => {
                    indices.sort_unstable();
                    indices.dedup();
                    return Some(indices);
                }
                None => {
                    let _ = writeln!(self.output, "Invalid selection: {line}");
                }
            }
        }
        None
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        let _ = write!(self.output, "{prompt} [y/N]: ");
        matches!(
            self.read_line().map(|l| l.to_ascii_lowercase()).as_deref(),
            Some("y") | Some("yes")
        )
    }

    fn input(&mut self, prompt: &str, default: Option<&str>) -> Option<String> {
        match default {
            Some(d) if !d.is_empty() => {
                let _ = write!(self.output, "{prompt} [{d}]: ");
            }
            _ => {
                let _ = write!(self.output, "{prompt}: ");
            }
        }

        let line = self.read_line()?;
        if line.is_empty() {
            return Some(default.unwrap_or_default().to_string());
        }
        Some(line)
    }

    fn input_secret(&mut self, prompt: &str) -> Option<String> {
        if self.tty {
            return rpassword::prompt_password(format!("{prompt}: ")).ok();
        }

        // Piped input: take the line as-is, a bare `q` is a valid secret
        let _ = write!(self.output, "{prompt}: ");
        let _ = self.output.flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }

    fn is_interactive(&self) -> bool {
        self.tty
    }
}

#[cfg(test)]
pub mod testing {
    use super::Prompter;
    use std::collections::VecDeque;

    /// One scripted answer
    #[derive(Debug, Clone)]
    pub enum Answer {
        Choose(Option<usize>),
        ChooseMany(Option<Vec<usize>>),
        Confirm(bool),
        Input(Option<String>),
        Secret(Option<String>),
    }

    /// Replays answers in order and panics on an unexpected prompt
    #[derive(Default)]
    pub struct ScriptedPrompter {
        answers: VecDeque<Answer>,
        pub asked: Vec<String>,
        interactive: bool,
    }

    impl ScriptedPrompter {
        pub fn new(answers: Vec<Answer>) -> Self {
            Self {
                answers: answers.into(),
                ..Self::default()
            }
        }

        /// Behave like a terminal, so optional questions are asked too.
        pub fn interactive(mut self) -> Self {
            self.interactive = true;
            self
        }

        fn next(&mut self, prompt: &str) -> Answer {
            self.asked.push(prompt.to_string());
            self.answers
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected prompt: {prompt}"))
        }
    }

    impl Prompter for ScriptedPrompter {
        fn choose(&mut self, prompt: &str, _options: &[String]) -> Option<usize> {
            match self.next(prompt) {
                Answer::Choose(answer) => answer,
                other => panic!("expected choose for '{prompt}', scripted {other:?}"),
            }
        }

        fn choose_many(&mut self, prompt: &str, _options: &[String], _preselected: &[usize]) -> Option<Vec<usize>> {
            match self.next(prompt) {
                Answer::ChooseMany(answer) => answer,
                other => panic!("expected choose_many for '{prompt}', scripted {other:?}"),
            }
        }

        fn confirm(&mut self, prompt: &str) -> bool {
            match self.next(prompt) {
                Answer::Confirm(answer) => answer,
                other => panic!("expected confirm for '{prompt}', scripted {other:?}"),
            }
        }

        fn input(&mut self, prompt: &str, _default: Option<&str>) -> Option<String> {
            match self.next(prompt) {
                Answer::Input(answer) => answer,
                other => panic!("expected input for '{prompt}', scripted {other:?}"),
            }
        }

        fn input_secret(&mut self, prompt: &str) -> Option<String> {
            match self.next(prompt) {
                Answer::Secret(answer) => answer,
                other => panic!("expected secret input for '{prompt}', scripted {other:?}"),
            }
        }

        fn is_interactive(&self) -> bool {
            self.interactive
        }
    }
}
