//! Интерактивный выбор пауз в терминале
//!
//! Команды:
//! - `n` / `next`, `p` / `prev`: листать страницы
//! - `<строка> <вариант>`: выбрать вариант (0 = без паузы)
//! - `g` / `generate`: подтвердить и собрать мастер-файлы
//! - `q` / `quit`: выйти без сборки

use std::io::{BufRead, Write};

use super::{ConfirmedSelections, PageView, PausePlacementSession, PauseSelector};
use crate::error::Result;

/// Выбор пауз через текстовый ввод
pub struct TerminalSelector<R, W> {
    input: R,
    output: W,
}

impl TerminalSelector<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Селектор на stdin/stdout
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalSelector<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn print_page(&mut self, page: &PageView) -> Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "=== Pause Selector: page {}/{} ===", page.page + 1, page.page_count.max(1))?;
        for row in &page.rows {
            writeln!(self.output, "{}", row.title)?;
            for (i, option) in row.options.iter().enumerate() {
                let marker = if option.choice == row.selected { "*" } else { " " };
                writeln!(self.output, "  {} [{}] {}", marker, i, option.label)?;
            }
        }

        let mut commands = Vec::new();
        if page.has_previous {
            commands.push("p = Previous");
        }
        if page.has_next {
            commands.push("n = Next");
        }
        commands.push("<row> <option> = choose");
        commands.push("g = Generate Master Files");
        commands.push("q = quit");
        writeln!(self.output, "{}", commands.join(" | "))?;
        write!(self.output, "> ")?;
        self.output.flush()?;
        Ok(())
    }
}

impl<R: BufRead, W: Write> PauseSelector for TerminalSelector<R, W> {
    fn run(&mut self, mut session: PausePlacementSession) -> Result<Option<ConfirmedSelections>> {
        let mut page = session.render();
        self.print_page(&page)?;

        let mut line = String::new();
        loop {
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                // Конец ввода равносилен закрытию окна
                log::warn!("Input closed before pauses were confirmed");
                return Ok(None);
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.as_slice() {
                [] => {}
                ["n"] | ["next"] => {
                    if !session.next() {
                        writeln!(self.output, "Already on the last page")?;
                    }
                }
                ["p"] | ["prev"] | ["previous"] => {
                    if !session.previous() {
                        writeln!(self.output, "Already on the first page")?;
                    }
                }
                ["g"] | ["generate"] => return Ok(Some(session.confirm())),
                ["q"] | ["quit"] => return Ok(None),
                [row, option] => match (row.parse::<usize>(), option.parse::<usize>()) {
                    (Ok(row_number), Ok(index)) => {
                        let choice = page
                            .rows
                            .iter()
                            .find(|view| view.row_number == row_number)
                            .and_then(|view| view.options.get(index))
                            .map(|option| option.choice);
                        match choice {
                            Some(choice) => session.select(row_number, choice)?,
                            None => writeln!(
                                self.output,
                                "Row {} has no option {} on this page",
                                row_number, index
                            )?,
                        }
                    }
                    _ => writeln!(self.output, "Expected: <row> <option>")?,
                },
                _ => writeln!(self.output, "Unknown command: {}", line.trim())?,
            }

            page = session.render();
            self.print_page(&page)?;
        }
    }
}
