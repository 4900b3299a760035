use crate::libmondai::ai::DashScopeClient;
use crate::libmondai::kotae::AnswerArea;
use crate::libmondai::mondai::Problem;
use crate::libmondai::sagyou::AiFill;
use crate::libmondai::settei::AiSettings;
use crate::Error;
use colored::Colorize;
#[cfg(feature = "kittygfx")]
use kitty_image::{Action, Command, WrappedCommand};
use log::debug;
use text_io::read;

#[derive(Debug, PartialEq)]
enum Choice {
    Ai,
    Confirm,
    Cancel,
    Edit(String),
}

impl Choice {
    fn from_str(input: &str) -> Choice {
        match input.trim() {
            "ai" => Choice::Ai,
            "c" => Choice::Confirm,
            "q" => Choice::Cancel,
            other => Choice::Edit(other.to_string()),
        }
    }
}

fn print_problem(problem: &Problem) {
    println!(
        "{}",
        format!("==========> Page {} <==========", problem.page_label()).cyan()
    );
    let body = problem.body.as_deref().unwrap_or("No problem text");
    println!("{}", body.black().bold().on_white());

    match problem.image_path() {
        None => println!("{}", "(no image)".dimmed()),
        Some(image_path) => {
            println!("{}", format!("Image: {}", image_path.display()).dimmed());
            #[cfg(feature = "kittygfx")]
            show_with_kitty(image_path);
        }
    }
}

/// Kitty only takes PNG straight from a file; other formats are left to the
/// path printed above.
#[cfg(feature = "kittygfx")]
fn kitty_displayable(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

#[cfg(feature = "kittygfx")]
fn show_with_kitty(image_path: &std::path::Path) {
    if !kitty_displayable(image_path) {
        debug!("[Image] {image_path:?} is not a PNG, skipping kitty display");
        return;
    }
    match image::image_dimensions(image_path) {
        Ok((width, height)) => {
            let action = Action::TransmitAndDisplay(
                kitty_image::ActionTransmission {
                    format: kitty_image::Format::Png,
                    medium: kitty_image::Medium::File,
                    width,
                    height,
                    ..Default::default()
                },
                kitty_image::ActionPut::default(),
            );
            let command = WrappedCommand::new(Command::with_payload_from_path(action, image_path));
            println!("{command}");
            print!("{}", "\n".repeat(height as usize / 20));
        }
        Err(err) => println!("{}", format!("Failed to load image: {err}").red()),
    }
}

fn print_area(area: &AnswerArea) {
    match area {
        AnswerArea::Radio(group) => {
            for option in group.options() {
                let mark = if group.selected() == Some(option.key.as_str()) {
                    "(•)"
                } else {
                    "( )"
                };
                println!("  {} {}", mark.bold(), option.label());
            }
        }
        AnswerArea::Checkbox(group) => {
            for (option, checked) in group.entries() {
                let mark = if *checked { "[x]" } else { "[ ]" };
                println!("  {} {}", mark.bold(), option.label());
            }
        }
        AnswerArea::Fill(fields) => {
            for (i, field) in fields.fields().iter().enumerate() {
                println!("  {} {}", format!("Blank {}:", i + 1).bold(), field);
            }
        }
    }
}

fn edit_hint(area: &AnswerArea) -> &'static str {
    match area {
        AnswerArea::Radio(_) => "<key> selects an option",
        AnswerArea::Checkbox(_) => "<key> toggles an option",
        AnswerArea::Fill(_) => "<n>=<text> fills blank n",
    }
}

fn apply_edit(area: &mut AnswerArea, input: &str) -> bool {
    match area {
        AnswerArea::Radio(group) => group.select(input),
        AnswerArea::Checkbox(group) => group.toggle(input),
        AnswerArea::Fill(fields) => match input.split_once('=') {
            Some((index, text)) => match index.trim().parse::<usize>() {
                Ok(n) if n >= 1 => fields.set(n - 1, text),
                _ => false,
            },
            None => false,
        },
    }
}

/// Terminal version of the dialog. Returns whether the user confirmed.
pub fn cli_loop(problem: &mut Problem, settings: AiSettings) -> Result<bool, Error> {
    let client = DashScopeClient::new(&settings.model, &settings.base_url, settings.timeout)?;
    let mut ai = AiFill::new(client);
    let mut area = AnswerArea::for_problem(problem);

    print_problem(problem);

    loop {
        if let Some(area) = &area {
            println!("{}", "Your answer:".cyan());
            print_area(area);
        }
        let hint = area.as_ref().map(edit_hint).unwrap_or("no answer input");
        print!(
            "{} ",
            format!("Command (ai = AI answer, c = confirm, q = cancel, {hint}):").cyan()
        );
        let input: String = read!("{}\n");
        let command = Choice::from_str(&input);
        debug!("command: {:?}", command);

        match command {
            Choice::Ai => {
                if let Err(err) = ai.start(&settings.api_key, problem.image_path(), || {}) {
                    println!("{}", err.to_string().yellow());
                    continue;
                }
                println!("{}", "AI thinking...".cyan());
                if let Some(outcome) = ai.wait(area.as_mut()) {
                    if outcome.is_success() {
                        println!("{}", outcome.notice().bright_green());
                    } else {
                        println!("{}", outcome.notice().bright_red());
                    }
                }
                ai.reset();
            }
            Choice::Confirm => {
                problem.commit_answers(area.as_ref());
                println!("{}", "Answers saved".bright_green());
                return Ok(true);
            }
            Choice::Cancel => {
                println!("{}", "Cancelled".cyan());
                return Ok(false);
            }
            Choice::Edit(text) => {
                let applied = match area.as_mut() {
                    Some(area) => apply_edit(area, &text),
                    None => false,
                };
                if !applied {
                    println!("{}", format!("Cannot apply {text:?}").bright_red());
                }
            }
        }
    }
}
