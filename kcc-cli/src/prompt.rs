//! Line-oriented terminal prompts.
//!
//! Generic over the reader and writer so dialogues can be driven from
//! in-memory buffers.

use crossterm::style::{style, Color, Stylize};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

pub struct Prompter<R, W> {
    input: R,
    output: W,
    hide_secrets: bool,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompter on the process terminal; secrets are read from the tty
    /// without echo.
    pub fn stdio() -> Self {
        Self {
            input: io::stdin().lock(),
            output: io::stdout(),
            hide_secrets: true,
        }
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            hide_secrets: false,
        }
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }

    pub fn say(&mut self, message: &str, color: Color) -> io::Result<()> {
        writeln!(self.output, "{}", style(message).with(color))?;
        self.output.flush()
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no answer received"));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn ask(&mut self, question: &str, color: Color) -> io::Result<String> {
        self.say(question, color)?;
        self.read_line()
    }

    /// Yes/no question; anything but y/Y/yes/YES counts as no.
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.ask(&format!("{} [y/n]", question), Color::Blue)?;
        Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
    }

    /// Free-form answer, possibly empty.
    pub fn text(&mut self, question: &str) -> io::Result<String> {
        Ok(self.ask(question, Color::Blue)?.trim().to_string())
    }

    /// Asks until a non-empty answer is given.
    pub fn required(&mut self, question: &str) -> io::Result<String> {
        loop {
            let answer = self.text(question)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            self.say("An answer is required.", Color::Red)?;
        }
    }

    pub fn secret(&mut self, question: &str) -> io::Result<String> {
        if !self.hide_secrets {
            return self.ask(question, Color::Blue);
        }
        self.say(question, Color::Blue)?;
        rpassword::read_password_from_tty(None)
    }

    /// Numbered menu; asks again until a valid index is entered.
    pub fn menu<S: AsRef<str>>(&mut self, question: &str, options: &[S]) -> io::Result<usize> {
        if options.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "menu has no options"));
        }
        let listing: Vec<String> = options
            .iter()
            .enumerate()
            .map(|(i, option)| format!("\t{}: {}", i, option.as_ref()))
            .collect();
        let question = format!("{}:\n{}", question, listing.join("\n"));

        loop {
            let answer = self.ask(&question, Color::Green)?;
            match answer.trim().parse::<usize>() {
                Ok(index) if index < options.len() => return Ok(index),
                _ => self.say("Wrong selection, please try again.", Color::Red)?,
            }
        }
    }

    /// Asks until the answer names an existing file.
    pub fn existing_path(&mut self, question: &str) -> io::Result<PathBuf> {
        loop {
            let answer = self.required(question)?;
            if Path::new(&answer).exists() {
                return Ok(PathBuf::from(answer));
            }
            self.say(&format!("{} does not exist.", answer), Color::Red)?;
        }
    }
}
