use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use polytopia_core::edit;
use polytopia_core::{PatchWriter, read_save};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(value_name = "SAVE.STATE")]
    path: PathBuf,
    /// Write the edited save here instead of replacing the input.
    #[arg(long, short, value_name = "PATH", global = true)]
    output: Option<PathBuf>,
    #[arg(long, global = true)]
    json: bool,
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(flatten)]
    Edit(EditCommand),
    #[command(flatten)]
    List(ListCommand),
}

#[derive(Debug, Subcommand)]
enum EditCommand {
    ModifyTileTerrain { x: u32, y: u32, terrain: u16 },
    ModifyTileOwner { x: u32, y: u32, owner: u8 },
    ModifyTileCapital { x: u32, y: u32, capital: u8 },
    ModifyTileRoad {
        x: u32,
        y: u32,
        #[arg(action = clap::ArgAction::Set)]
        road: bool,
    },
    ResetTile { x: u32, y: u32 },
    AddCity { x: u32, y: u32, name: String, tribe: u8 },
    RevealTile { x: u32, y: u32, tribe: u8 },
    RevealAllTiles { tribe: u8 },
    ModifyUnitTribe { x: u32, y: u32, tribe: u8 },
    ModifyUnitType { x: u32, y: u32, kind: u16 },
    ConvertTribeUnits { old: u8, new: u8 },
    ConvertAllUnits { new: u8 },
    ExpandRows { height: u16 },
    ExpandColumns { width: u16 },
    ExpandMap { size: u16 },
    ModifyMapDimensions { width: u16, height: u16 },
    AddPlayer {
        #[arg(long)]
        name: Option<String>,
        #[arg(default_value_t = 255)]
        r: u8,
        #[arg(default_value_t = 255)]
        g: u8,
        #[arg(default_value_t = 255)]
        b: u8,
    },
    ModifyPlayerColor { id: u8, r: u8, g: u8, b: u8 },
    ModifyPlayerTribe { id: u8, tribe: u16 },
    ModifyPlayerName { id: u8, name: String },
    SwapPlayers { a: u8, b: u8 },
    ResetGame,
    RewriteCurrent,
}

#[derive(Debug, Subcommand)]
enum ListCommand {
    ListCities,
    ListUnits,
    ListPlayers,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Applies one edit and returns the line reported on success.
fn apply(command: EditCommand, writer: &mut PatchWriter) -> polytopia_core::Result<String> {
    let message = match command {
        EditCommand::ModifyTileTerrain { x, y, terrain } => {
            edit::modify_tile_terrain(writer, x, y, terrain)?;
            format!("tile ({x},{y}) terrain set to {terrain}")
        }
        EditCommand::ModifyTileOwner { x, y, owner } => {
            edit::modify_tile_owner(writer, x, y, owner)?;
            format!("tile ({x},{y}) owner set to {owner}")
        }
        EditCommand::ModifyTileCapital { x, y, capital } => {
            edit::modify_tile_capital(writer, x, y, capital)?;
            format!("tile ({x},{y}) capital set to {capital}")
        }
        EditCommand::ModifyTileRoad { x, y, road } => {
            edit::modify_tile_road(writer, x, y, road)?;
            format!("tile ({x},{y}) road set to {road}")
        }
        EditCommand::ResetTile { x, y } => {
            edit::reset_tile(writer, x, y)?;
            format!("tile ({x},{y}) reset")
        }
        EditCommand::AddCity { x, y, name, tribe } => {
            edit::add_city(writer, x, y, &name, tribe)?;
            format!("city {name:?} added at ({x},{y}) for player {tribe}")
        }
        EditCommand::RevealTile { x, y, tribe } => {
            if edit::reveal_tile(writer, x, y, tribe)? {
                format!("tile ({x},{y}) revealed to player {tribe}")
            } else {
                format!("tile ({x},{y}) already visible to player {tribe}")
            }
        }
        EditCommand::RevealAllTiles { tribe } => {
            let count = edit::reveal_all_tiles(writer, tribe)?;
            format!("{count} tiles revealed to player {tribe}")
        }
        EditCommand::ModifyUnitTribe { x, y, tribe } => {
            edit::modify_unit_tribe(writer, x, y, tribe)?;
            format!("unit at ({x},{y}) now belongs to player {tribe}")
        }
        EditCommand::ModifyUnitType { x, y, kind } => {
            edit::modify_unit_type(writer, x, y, kind)?;
            format!("unit at ({x},{y}) type set to {kind}")
        }
        EditCommand::ConvertTribeUnits { old, new } => {
            let count = edit::convert_tribe_units(writer, old, new)?;
            format!("{count} units moved from player {old} to player {new}")
        }
        EditCommand::ConvertAllUnits { new } => {
            let count = edit::convert_all_units(writer, new)?;
            format!("{count} units moved to player {new}")
        }
        EditCommand::ExpandRows { height } => {
            edit::expand_rows(writer, height)?;
            format!("map height expanded to {height}")
        }
        EditCommand::ExpandColumns { width } => {
            edit::expand_columns(writer, width)?;
            format!("map width expanded to {width}")
        }
        EditCommand::ExpandMap { size } => {
            edit::expand_map(writer, size)?;
            format!("map expanded to {size}x{size}")
        }
        EditCommand::ModifyMapDimensions { width, height } => {
            edit::modify_map_dimensions(writer, width, height)?;
            format!("map dimensions set to {width}x{height}")
        }
        EditCommand::AddPlayer { name, r, g, b } => {
            let id = edit::add_player(writer, name.as_deref(), [r, g, b])?;
            let name = name.unwrap_or_else(|| edit::default_player_name(id));
            format!("player {name:?} added with id {id}")
        }
        EditCommand::ModifyPlayerColor { id, r, g, b } => {
            edit::modify_player_color(writer, id, [r, g, b])?;
            format!("player {id} colour set to ({r},{g},{b})")
        }
        EditCommand::ModifyPlayerTribe { id, tribe } => {
            edit::modify_player_tribe(writer, id, tribe)?;
            format!("player {id} tribe set to {tribe}")
        }
        EditCommand::ModifyPlayerName { id, name } => {
            edit::modify_player_name(writer, id, &name)?;
            format!("player {id} renamed to {name:?}")
        }
        EditCommand::SwapPlayers { a, b } => {
            edit::swap_players(writer, a, b)?;
            format!("players {a} and {b} swapped")
        }
        EditCommand::ResetGame => {
            edit::reset_game(writer)?;
            "current snapshot reset to the initial map".to_string()
        }
        EditCommand::RewriteCurrent => {
            edit::rewrite_current(writer)?;
            "current snapshot rewritten".to_string()
        }
    };
    Ok(message)
}

fn list(command: &ListCommand, bytes: &[u8], as_json: bool) -> polytopia_core::Result<String> {
    let rendered = match command {
        ListCommand::ListCities => {
            let cities = edit::list_cities(bytes)?;
            if as_json {
                json!(cities).to_string()
            } else {
                let mut lines = Vec::new();
                for (owner, cities) in &cities {
                    for city in cities {
                        lines.push(format!("{owner:>3}  ({},{})  {}", city.x, city.y, city.name));
                    }
                }
                lines.join("\n")
            }
        }
        ListCommand::ListUnits => {
            let units = edit::list_units(bytes)?;
            if as_json {
                json!(units).to_string()
            } else {
                let mut lines = Vec::new();
                for (owner, units) in &units {
                    for unit in units {
                        lines.push(format!(
                            "{owner:>3}  ({},{})  type {}",
                            unit.x, unit.y, unit.kind
                        ));
                    }
                }
                lines.join("\n")
            }
        }
        ListCommand::ListPlayers => {
            let players = edit::list_players(bytes)?;
            if as_json {
                json!(players).to_string()
            } else {
                players
                    .iter()
                    .map(|p| {
                        let [r, g, b] = p.color;
                        format!(
                            "{:>3}  {:<20} tribe {:<3} colour #{r:02x}{g:02x}{b:02x}",
                            p.id, p.name, p.tribe
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    };
    Ok(rendered)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command = match cli.command {
        Command::List(listing) => {
            if cli.output.is_some() {
                eprintln!("--output only applies to edits");
                process::exit(2);
            }
            let bytes = read_save(&cli.path).unwrap_or_else(|e| {
                eprintln!("Error reading {}: {e}", cli.path.display());
                process::exit(1);
            });
            let rendered = list(&listing, &bytes, cli.json).unwrap_or_else(|e| {
                eprintln!("Error parsing save file: {}", cli.path.display());
                eprintln!("  {e}");
                process::exit(1);
            });
            if !rendered.is_empty() {
                println!("{rendered}");
            }
            return;
        }
        Command::Edit(command) => command,
    };

    debug!(?command, path = %cli.path.display(), "applying edit");
    let target = cli.output.clone().unwrap_or_else(|| cli.path.clone());
    let message = polytopia_core::edit_file(&cli.path, cli.output.as_deref(), |writer| {
        apply(command, writer)
    })
    .unwrap_or_else(|e| {
        eprintln!("Error applying edit to {}: {e}", cli.path.display());
        process::exit(1);
    });

    if cli.json {
        println!(
            "{}",
            json!({ "message": message, "path": target.display().to_string() })
        );
    } else {
        println!("{message}");
        println!("Saved {}", target.display());
    }
}
