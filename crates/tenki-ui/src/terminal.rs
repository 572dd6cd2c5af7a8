//! Line-oriented front end.
//!
//! Shows numbered region and prefecture menus, fetches the chosen
//! prefecture's forecast and prints it together with the history.

use std::io::{self, BufRead, Write};

use crate::models::{DropdownOption, ForecastModel};

const TITLE: &str = "天気予報アプリ";
const INVALID_CHOICE: &str = "無効な選択です。";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Menu {
    Region,
    Prefecture,
}

/// Run the interactive loop until `q` or end of input.
///
/// `notices` are printed under the title, before the model's own startup
/// messages.
///
/// # Errors
/// Returns any I/O error from reading `input` or writing `output`.
pub fn run<R: BufRead, W: Write>(
    model: &mut ForecastModel,
    notices: &[String],
    input: R,
    output: &mut W,
) -> io::Result<()> {
    writeln!(output, "{}", TITLE)?;
    for message in notices.iter().cloned().chain(model.startup_messages()) {
        writeln!(output, "! {}", message)?;
    }

    let mut menu = Menu::Region;
    let mut lines = input.lines();

    loop {
        match menu {
            Menu::Region => print_regions(model, output)?,
            Menu::Prefecture => print_prefectures(model, output)?,
        }
        output.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let choice = line.trim();

        match choice {
            "" => continue,
            "q" => break,
            "h" => {
                print_history(model, output)?;
                continue;
            }
            "b" if menu == Menu::Prefecture => {
                menu = Menu::Region;
                continue;
            }
            _ => {}
        }

        match menu {
            Menu::Region => match pick(&model.region_options(), choice) {
                Some(code) => {
                    model.select_region(&code);
                    menu = Menu::Prefecture;
                }
                None => writeln!(output, "{}", INVALID_CHOICE)?,
            },
            Menu::Prefecture => match pick(model.prefecture_options(), choice) {
                Some(code) => {
                    model.select_prefecture(&code);
                    fetch_and_print(model, output)?;
                }
                None => writeln!(output, "{}", INVALID_CHOICE)?,
            },
        }
    }

    writeln!(output, "終了します。")?;
    Ok(())
}

/// Resolve a 1-based menu number to an option key.
fn pick(options: &[DropdownOption], choice: &str) -> Option<String> {
    let index = choice.parse::<usize>().ok()?.checked_sub(1)?;
    options.get(index).map(|o| o.key.clone())
}

fn print_options<W: Write>(output: &mut W, options: &[DropdownOption]) -> io::Result<()> {
    for (i, option) in options.iter().enumerate() {
        writeln!(output, "  {:>2}) {}", i + 1, option.text)?;
    }
    Ok(())
}

fn print_regions<W: Write>(model: &ForecastModel, output: &mut W) -> io::Result<()> {
    let regions = model.region_options();
    writeln!(output)?;
    if regions.is_empty() {
        writeln!(output, "地域データがありません。")?;
    } else {
        writeln!(output, "[地域]")?;
        print_options(output, &regions)?;
    }
    write!(output, "地域を選択 (番号, h: 履歴, q: 終了)> ")
}

fn print_prefectures<W: Write>(model: &ForecastModel, output: &mut W) -> io::Result<()> {
    writeln!(output)?;
    writeln!(output, "[都道府県]")?;
    print_options(output, model.prefecture_options())?;
    write!(output, "都道府県を選択 (番号, b: 戻る, h: 履歴, q: 終了)> ")
}

fn fetch_and_print<W: Write>(model: &mut ForecastModel, output: &mut W) -> io::Result<()> {
    writeln!(output, "取得中...")?;
    let timeout = model.fetch_timeout();
    model.wait_for_fetch(timeout);

    writeln!(output)?;
    writeln!(output, "[天気情報]")?;
    for line in model.weather_lines() {
        writeln!(output, "{}", line)?;
        writeln!(output)?;
    }
    if let Some(message) = model.error_message() {
        writeln!(output, "! {}", message)?;
    }

    if model.history_enabled() {
        print_history(model, output)?;
    }
    Ok(())
}

fn print_history<W: Write>(model: &ForecastModel, output: &mut W) -> io::Result<()> {
    writeln!(output)?;
    writeln!(output, "[履歴]")?;
    if !model.history_enabled() {
        writeln!(output, "履歴は無効です。")?;
    } else if model.history_lines().is_empty() {
        writeln!(output, "履歴はありません。")?;
    } else {
        for line in model.history_lines() {
            writeln!(output, "{}", line)?;
        }
    }
    Ok(())
}
