use crate::calc_engine::Evaluator;
use crate::format::{format_number, format_record};
use crate::history::History;
use crate::style::{Styler, Tag};
use anyhow::Result;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuSelection {
    Calculate,
    ViewHistory,
    Exit,
    Invalid,
}

/// Interprets one line typed at the menu prompt.
///
/// Returns `None` when the line is not a number at all. Numbers outside
/// 1..=3, including non-integers such as `1.5`, are `Invalid`.
pub fn parse_selection(line: &str) -> Option<MenuSelection> {
    let line = line.trim();
    match line.parse::<i64>() {
        Ok(1) => Some(MenuSelection::Calculate),
        Ok(2) => Some(MenuSelection::ViewHistory),
        Ok(3) => Some(MenuSelection::Exit),
        Ok(_) => Some(MenuSelection::Invalid),
        Err(_) => match line.parse::<f64>() {
            Ok(n) if n.is_finite() => Some(MenuSelection::Invalid),
            _ => None,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Terminate,
}

pub struct Console<R, W, E> {
    input: R,
    output: W,
    styler: Styler,
    evaluator: E,
    history: History,
}

impl<R: BufRead, W: Write, E: Evaluator> Console<R, W, E> {
    pub fn new(input: R, output: W, styler: Styler, evaluator: E) -> Self {
        Console {
            input,
            output,
            styler,
            evaluator,
            history: History::new(),
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs the menu until the user exits or input is closed.
    pub fn run(&mut self) -> Result<()> {
        while self.step()? == Flow::Continue {}
        Ok(())
    }

    /// One full menu cycle: show the options, read a choice, dispatch it.
    pub fn step(&mut self) -> Result<Flow> {
        self.show_menu()?;

        let line = match self.read_line()? {
            Some(line) => line,
            None => {
                writeln!(self.output)?;
                return Ok(Flow::Terminate);
            }
        };

        match parse_selection(&line) {
            None => self.notice(Tag::Error, "Invalid input! Please enter a number between 1 and 3.")?,
            Some(MenuSelection::Invalid) => {
                self.notice(Tag::Error, "Invalid choice. Please enter a number between 1 and 3.")?
            }
            Some(MenuSelection::Calculate) => self.calculate()?,
            Some(MenuSelection::ViewHistory) => self.show_history()?,
            Some(MenuSelection::Exit) => {
                let farewell = self.styler.banner(Tag::Farewell, "  Exiting.  ");
                writeln!(self.output, "{}", farewell)?;
                self.output.flush()?;
                return Ok(Flow::Terminate);
            }
        }
        Ok(Flow::Continue)
    }

    pub fn show_menu(&mut self) -> Result<()> {
        let s = self.styler;
        writeln!(self.output)?;
        writeln!(self.output, "{}", s.banner(Tag::Title, "  Calculator Menu  "))?;
        writeln!(self.output, "{}", s.paint(Tag::Success, "1. Perform Calculation"))?;
        writeln!(self.output, "{}", s.paint(Tag::Warning, "2. View History"))?;
        writeln!(self.output, "{}", s.paint(Tag::Error, "3. Exit"))?;
        write!(self.output, "Choose an option: ")?;
        self.output.flush()?;
        Ok(())
    }

    /// Reads an expression, evaluates it and records it on success.
    ///
    /// Evaluation failures are reported to the user and never returned as errors;
    /// only I/O failures propagate.
    pub fn calculate(&mut self) -> Result<()> {
        let s = self.styler;
        write!(
            self.output,
            "{}{}{}",
            s.paint(Tag::Prompt, "Enter a mathematical expression (for example, "),
            s.paint(Tag::Example, "3+5*(2-8)"),
            s.paint(Tag::Prompt, "): "),
        )?;
        self.output.flush()?;

        let expression = self.read_line()?.unwrap_or_default();

        match self.evaluator.evaluate(&expression) {
            Ok(value) => {
                writeln!(
                    self.output,
                    "{}{}",
                    s.paint(Tag::Warning, "Result: "),
                    s.paint(Tag::Result, &format_number(value)),
                )?;
                self.history.append(format_record(&expression, value));
            }
            Err(e) => {
                let message = format!("Invalid expression! Please try again. ({})", e);
                self.notice(Tag::Error, &message)?;
            }
        }
        Ok(())
    }

    pub fn show_history(&mut self) -> Result<()> {
        let s = self.styler;
        if self.history.is_empty() {
            writeln!(self.output)?;
            return self.notice(Tag::Error, "No calculations yet!");
        }

        writeln!(self.output)?;
        writeln!(self.output, "{}", s.paint(Tag::Title, "Calculation History:"))?;
        let width = self.history.len().to_string().len();
        for (i, record) in self.history.iter().enumerate() {
            let line = format!("{:>width$}. {}", i + 1, record, width = width);
            let tag = if (i + 1) % 2 == 0 { Tag::Warning } else { Tag::Plain };
            writeln!(self.output, "{}", s.paint(tag, &line))?;
        }
        self.output.flush()?;
        Ok(())
    }

    fn notice(&mut self, tag: Tag, message: &str) -> Result<()> {
        writeln!(self.output, "{}", self.styler.paint(tag, message))?;
        self.output.flush()?;
        Ok(())
    }

    // Whole lines only, so a rejected entry never leaks into the next read.
    // Bytes that are not UTF-8 become U+FFFD and are rejected downstream.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut buf = Vec::new();
        if self.input.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&buf);
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }
}
