//! Line-oriented game client.
//!
//! A simple protocol over stdin/stdout:
//! - Lines starting with `#` are commands (spells, dice, undo, save...)
//! - Anything else is sent to the narrator as a player action
//!
//! Output lines are tagged (`[DM]`, `[OPTIONS]`, `[ERROR]`...) so the client
//! can be driven by scripts as well as by a person.

use chronicle_core::persist::{HttpBlobStore, AUTOSAVE_KEY};
use chronicle_core::spells::learnable_spells;
use chronicle_core::tables::xp_to_next_level;
use chronicle_core::{
    Ability, ChatSettings, FileStore, GameSession, Narrator, ResponseLength, SessionConfig,
    SessionError, Skill, TurnOutcome,
};
use std::io::{self, BufRead, Write};

/// A parsed `#` command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Quit,
    Help,
    Status,
    Spells,
    Library(Option<u8>),
    Cast(usize),
    Learn(String),
    Forget { index: usize, confirmed: bool },
    Rest,
    Roll(String),
    Check(Ability),
    Skill(Skill),
    Pick(usize),
    Undo,
    Redo,
    LevelUp,
    Add(String),
    Custom { level: u8, name: String, description: String },
    Drop(usize),
    Confirm,
    Length(ResponseLength),
    Key(Option<String>),
    Save(String),
    Load(String),
    Upload(String),
    Download(String),
}

const HELP: &str = "\
  #status                  - Character sheet summary
  #spells                  - Known spells and slots
  #library [level]         - Library spells you can learn
  #cast <n>                - Cast known spell n
  #learn <name>            - Learn a library spell
  #forget <n> confirm      - Forget known spell n
  #rest                    - Long rest
  #roll <die>              - Roll d4, d6, d8, d10, d12, d20 or d100
  #check <ability>         - Ability check (str, dex, ...)
  #skill <skill>           - Skill check (persuasion, stealth, ...)
  #pick <n>                - Send suggested action n
  #undo / #redo            - Step through history
  #levelup                 - Show the pending level-up
  #add <name>              - Level-up: add a library spell
  #custom <lvl> <name> | <description>
                           - Level-up: add a custom spell
  #drop <n>                - Level-up: remove spell n
  #confirm                 - Level-up: finish
  #length <short|normal|long>
  #key [api key]           - Set or clear the Gemini API key
  #save [name] / #load [name]
  #upload <code> / #download <code>
  #quit                    - Exit
  (anything else is sent as player action)";

/// Parse the text after `#`.
pub fn parse_command(input: &str) -> Result<Command, String> {
    let input = input.trim();
    let (name, rest) = input.split_once(char::is_whitespace).unwrap_or((input, ""));
    let rest = rest.trim();

    let index = |arg: &str| -> Result<usize, String> {
        match arg.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n - 1),
            _ => Err(format!("expected a number from the list, got '{arg}'")),
        }
    };
    let required = |arg: &str, usage: &str| -> Result<String, String> {
        if arg.is_empty() {
            Err(format!("usage: {usage}"))
        } else {
            Ok(arg.to_string())
        }
    };

    let command = match name.to_lowercase().as_str() {
        "quit" | "exit" => Command::Quit,
        "help" => Command::Help,
        "status" | "sheet" => Command::Status,
        "spells" => Command::Spells,
        "library" => {
            let level = if rest.is_empty() {
                None
            } else {
                Some(rest.parse::<u8>().map_err(|_| format!("bad spell level '{rest}'"))?)
            };
            Command::Library(level)
        }
        "cast" => Command::Cast(index(rest)?),
        "learn" => Command::Learn(required(rest, "#learn <name>")?),
        "forget" => {
            let mut parts = rest.split_whitespace();
            let n = index(parts.next().unwrap_or(""))?;
            Command::Forget {
                index: n,
                confirmed: parts.next() == Some("confirm"),
            }
        }
        "rest" => Command::Rest,
        "roll" => Command::Roll(required(rest, "#roll <die>")?),
        "check" => Command::Check(
            Ability::from_name(rest).ok_or_else(|| format!("unknown ability '{rest}'"))?,
        ),
        "skill" => {
            Command::Skill(Skill::from_name(rest).ok_or_else(|| format!("unknown skill '{rest}'"))?)
        }
        "pick" => Command::Pick(index(rest)?),
        "undo" => Command::Undo,
        "redo" => Command::Redo,
        "levelup" => Command::LevelUp,
        "add" => Command::Add(required(rest, "#add <name>")?),
        "custom" => {
            let usage = "#custom <level> <name> | <description>";
            let (level, entry) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| format!("usage: {usage}"))?;
            let level = level
                .parse::<u8>()
                .map_err(|_| format!("usage: {usage}"))?;
            let (name, description) = entry.split_once('|').unwrap_or((entry, ""));
            Command::Custom {
                level,
                name: name.trim().to_string(),
                description: description.trim().to_string(),
            }
        }
        "drop" => Command::Drop(index(rest)?),
        "confirm" => Command::Confirm,
        "length" => Command::Length(rest.parse()?),
        "key" => Command::Key((!rest.is_empty()).then(|| rest.to_string())),
        "save" => Command::Save(non_empty_or_autosave(rest)),
        "load" => Command::Load(non_empty_or_autosave(rest)),
        "upload" => Command::Upload(required(rest, "#upload <code>")?),
        "download" => Command::Download(required(rest, "#download <code>")?),
        other => return Err(format!("unknown command '#{other}'. Type #help for help.")),
    };
    Ok(command)
}

fn non_empty_or_autosave(arg: &str) -> String {
    if arg.is_empty() {
        AUTOSAVE_KEY.to_string()
    } else {
        arg.to_string()
    }
}

/// Run the client until `#quit` or end of input.
pub async fn run_headless(config: SessionConfig) -> Result<(), SessionError> {
    let store = config.file_store();
    let remote = config.remote_store();
    let mut session = GameSession::resume(config.narrator(), config.settings, &store).await?;

    println!("=== {} ===", chronicle_core::campaign::CAMPAIGN_TITLE);
    print_status(&session);
    println!();
    println!("Type #help for commands. Enter your actions (one per line):");
    println!();

    if session.messages().is_empty() {
        if session.narrator().has_credential() {
            report(session.begin_adventure().await.map(|o| o.into_iter().collect()));
        } else {
            println!("[ERROR] No API key configured. Use #key <api key> or set GEMINI_API_KEY.");
        }
    } else if let Some(last) = session.messages().last() {
        println!("[DM]");
        println!("{}", last.text);
        print_options(session.suggested_actions());
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('#') {
            match parse_command(command) {
                Ok(Command::Quit) => {
                    println!("Goodbye!");
                    break;
                }
                Ok(command) => {
                    execute(&mut session, command, &store, remote.as_ref()).await;
                }
                Err(e) => println!("[ERROR] {e}"),
            }
        } else {
            print!("[PROCESSING]");
            stdout.flush().ok();
            let result = session.send_action(line).await;
            print!("\r            \r");
            stdout.flush().ok();
            report(result.map(|o| vec![o]));
        }

        if let Err(e) = session.autosave(&store).await {
            tracing::warn!(error = %e, "autosave failed");
        }
        stdout.flush().ok();
    }

    Ok(())
}

async fn execute<N: Narrator>(
    session: &mut GameSession<N>,
    command: Command,
    store: &FileStore,
    remote: Option<&HttpBlobStore>,
) {
    match command {
        Command::Quit => {}
        Command::Help => {
            println!("[HELP]");
            println!("{HELP}");
        }
        Command::Status => print_status(session),
        Command::Spells => print_spells(session),
        Command::Library(level) => {
            println!("[LIBRARY]");
            for def in learnable_spells(session.character(), level) {
                println!("  L{} {} ({}) - {}", def.level, def.name, def.school, def.description);
            }
        }
        Command::Cast(index) => report(session.cast_spell(index).await.map(|o| vec![o])),
        Command::Learn(name) => match session.learn_spell(&name) {
            Ok(()) => println!("[LEARNED] {name}"),
            Err(e) => println!("[ERROR] {e}"),
        },
        Command::Forget { index, confirmed } => {
            if !confirmed {
                println!("[CONFIRM] Repeat as '#forget {} confirm' to forget it.", index + 1);
                return;
            }
            match session.forget_spell(index, true) {
                Ok(name) => println!("[FORGOTTEN] {name}"),
                Err(e) => println!("[ERROR] {e}"),
            }
        }
        Command::Rest => report(session.rest().await.map(|o| vec![o])),
        Command::Roll(die) => report(session.roll_die(&die).await.map(|o| vec![o])),
        Command::Check(ability) => report(session.ability_check(ability).await.map(|o| vec![o])),
        Command::Skill(skill) => report(session.skill_check(skill).await.map(|o| vec![o])),
        Command::Pick(index) => match session.suggested_actions().get(index).cloned() {
            Some(action) => report(session.send_action(&action).await.map(|o| vec![o])),
            None => println!("[ERROR] No suggested action {}", index + 1),
        },
        Command::Undo => match session.undo() {
            Ok(()) => {
                println!("[UNDO] {} messages", session.messages().len());
                if session.level_up_pending() {
                    print_level_up(session);
                }
            }
            Err(e) => println!("[ERROR] {e}"),
        },
        Command::Redo => match session.redo() {
            Ok(()) => {
                println!("[REDO] {} messages", session.messages().len());
                if session.level_up_pending() {
                    print_level_up(session);
                }
            }
            Err(e) => println!("[ERROR] {e}"),
        },
        Command::LevelUp => print_level_up(session),
        Command::Add(name) => edit_draft(session, |draft| draft.add_from_library(&name)),
        Command::Custom {
            level,
            name,
            description,
        } => edit_draft(session, |draft| draft.add_custom(&name, level, &description)),
        Command::Drop(index) => edit_draft(session, |draft| draft.remove(index).map(|_| ())),
        Command::Confirm => report(session.confirm_level_up().await.map(|o| vec![o])),
        Command::Length(length) => {
            session.set_settings(ChatSettings {
                response_length: length,
            });
            println!("[SETTINGS] Response length: {length}");
        }
        Command::Key(key) => {
            let set = key.is_some();
            session.set_api_key(key);
            println!("[SETTINGS] API key {}", if set { "set" } else { "cleared" });
            if set {
                report(session.begin_adventure().await.map(|o| o.into_iter().collect()));
            }
        }
        Command::Save(key) => match session.save_local(store, &key).await {
            Ok(()) => println!("[SAVED] {key}"),
            Err(e) => println!("[ERROR] Save failed: {e}"),
        },
        Command::Load(key) => match session.load_local(store, &key).await {
            Ok(()) => {
                println!("[LOADED] {key}");
                print_status(session);
            }
            Err(e) => println!("[ERROR] Load failed: {e}"),
        },
        Command::Upload(code) => match remote {
            Some(remote) => match session.upload(remote, &code).await {
                Ok(code) => println!("[UPLOADED] Session code: {code}"),
                Err(e) => println!("[ERROR] Upload failed: {e}"),
            },
            None => println!("[ERROR] Remote saves are not configured"),
        },
        Command::Download(code) => match remote {
            Some(remote) => match session.download(remote, &code).await {
                Ok(()) => {
                    println!("[DOWNLOADED] {code}");
                    print_status(session);
                }
                Err(e) => println!("[ERROR] Download failed: {e}"),
            },
            None => println!("[ERROR] Remote saves are not configured"),
        },
    }
}

fn edit_draft<N, F, E>(session: &mut GameSession<N>, edit: F)
where
    N: Narrator,
    F: FnOnce(&mut chronicle_core::progression::LevelUpDraft) -> Result<(), E>,
    E: std::fmt::Display,
{
    match session.level_up_draft_mut() {
        Some(draft) => match edit(draft) {
            Ok(()) => print_level_up(session),
            Err(e) => println!("[ERROR] {e}"),
        },
        None => println!("[ERROR] {}", SessionError::NoLevelUpPending),
    }
}

fn report(result: Result<Vec<TurnOutcome>, SessionError>) {
    match result {
        Ok(outcomes) => {
            for outcome in outcomes {
                print_outcome(&outcome);
            }
        }
        Err(e) => println!("[ERROR] {e}"),
    }
}

fn print_outcome(outcome: &TurnOutcome) {
    println!("[DM]");
    for para in outcome.narrative.split("\n\n") {
        println!("{para}");
    }
    println!();
    print_options(&outcome.suggested_actions);
    if let Some((from, to)) = outcome.level_up {
        println!("[LEVEL UP] Level {from} -> {to}. Use #levelup to choose spells, then #confirm.");
    }
}

fn print_options(actions: &[String]) {
    if actions.is_empty() {
        return;
    }
    println!("[OPTIONS]");
    for (i, action) in actions.iter().enumerate() {
        println!("  {}. {action}", i + 1);
    }
}

fn print_status<N: Narrator>(session: &GameSession<N>) {
    let c = session.character();
    let location = session.location();
    println!("[STATUS]");
    match xp_to_next_level(c.level, c.xp) {
        Some(needed) => println!(
            "  {} - level {} {} (XP {}, {} to next level)",
            c.name, c.level, c.class_name, c.xp, needed
        ),
        None => println!("  {} - level {} {} (XP {})", c.name, c.level, c.class_name, c.xp),
    }
    println!("  HP: {}/{}  AC: {}  Gold: {}", c.hp, c.max_hp, c.ac, c.gold);
    println!(
        "  Spell save DC: {}  Spell attack: {:+}  Proficiency: {:+}",
        c.spell_save_dc(),
        c.spell_attack_bonus(),
        c.proficiency_bonus()
    );
    let abilities = Ability::all()
        .iter()
        .map(|a| format!("{} {} ({:+})", a, c.abilities.get(*a), c.ability_modifier(*a)))
        .collect::<Vec<_>>()
        .join(", ");
    println!("  {abilities}");
    if !c.companions.is_empty() {
        let companions = c
            .companions
            .iter()
            .map(|m| format!("{} ({}/{})", m.name, m.hp, m.max_hp))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  Companions: {companions}");
    }
    if !c.inventory.is_empty() {
        let items = c
            .inventory
            .iter()
            .map(|i| format!("{} x{}", i.name, i.quantity))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  Inventory: {items}");
    }
    println!("  Location: {} ({})", location.name, location.npcs.join(", "));
    if session.level_up_pending() {
        println!("  Level-up pending: use #levelup");
    }
}

fn print_spells<N: Narrator>(session: &GameSession<N>) {
    let c = session.character();
    let limits = c.spell_limits();
    println!("[SPELLS]");
    println!(
        "  Cantrips {}/{}  Spells {}/{}",
        c.cantrips_known(),
        limits.cantrips,
        c.spells_known(),
        limits.spells_known
    );
    let slots = c
        .spell_slots
        .max
        .keys()
        .map(|level| {
            format!(
                "L{level} {}/{}",
                c.spell_slots.remaining(*level),
                c.spell_slots.maximum(*level)
            )
        })
        .collect::<Vec<_>>()
        .join("  ");
    println!("  Slots: {slots}");
    for (i, spell) in c.spells.iter().enumerate() {
        println!("  {}. L{} {}", i + 1, spell.level, spell.name);
    }
}

fn print_level_up<N: Narrator>(session: &GameSession<N>) {
    let Some(draft) = session.level_up_draft() else {
        println!("[ERROR] {}", SessionError::NoLevelUpPending);
        return;
    };
    let up = draft.level_up();
    println!("[LEVEL UP] {} -> {}", up.from_level, up.to_level);
    println!("  HP +{}", up.hp_gain());
    let slots = up
        .new_slot_maximums()
        .iter()
        .map(|(level, count)| format!("L{level} {count}"))
        .collect::<Vec<_>>()
        .join("  ");
    println!("  Slots: {slots}");
    for (i, spell) in draft.spells().iter().enumerate() {
        println!("  {}. L{} {}", i + 1, spell.level, spell.name);
    }
    let available = draft
        .available_library(None)
        .iter()
        .map(|d| d.name)
        .collect::<Vec<_>>()
        .join(", ");
    println!("  Library: {available}");
}
