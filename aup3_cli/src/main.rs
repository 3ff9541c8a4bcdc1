use std::{env::args, io};

use anyhow::{anyhow, bail, Context};

use aup3::{document::write_xml, Project};

const USAGE: &str = "usage: aup3_cli <labels|tracks|block|xml> <file.aup3> [block-id]";

pub fn main() -> anyhow::Result<()> {
    env_logger::init();

    let command = args().nth(1).ok_or_else(|| anyhow!(USAGE))?;
    let file = args().nth(2).ok_or_else(|| anyhow!(USAGE))?;

    let project = Project::open(&file).with_context(|| format!("Failed to open {}", file))?;
    for diagnostic in project.diagnostics() {
        log::warn!("{}", diagnostic);
    }

    match command.as_str() {
        "labels" => {
            for label in project.labels() {
                println!("{}", label);
            }
        }
        "tracks" => {
            println!("rate {} Hz, format {:#010x}", project.fps(), project.version());
            for (index, track) in project.tracks().iter().enumerate() {
                println!(
                    "{}: \"{}\" channel {}, {} Hz, {} clips, {} blocks, {:.3} s",
                    index,
                    track.name,
                    track.channel,
                    track.rate,
                    track.clips.len(),
                    track.blocks.len(),
                    track.end_time()
                );
            }
        }
        "block" => {
            let id = args()
                .nth(3)
                .ok_or_else(|| anyhow!(USAGE))?
                .parse::<i64>()
                .context("Block id is not an integer")?;
            for sample in project.load_waveblock(id)? {
                println!("{}", sample);
            }
        }
        "xml" => {
            let raw = project.raw_document()?;
            write_xml(&raw, io::stdout().lock())?;
        }
        x => bail!("Unknown command {}\n{}", x, USAGE),
    }

    Ok(())
}
