//! `berth graph` command

use anyhow::Result;

use crate::cli::GraphArgs;
use crate::commands::configure_project;
use berth::util::GlobalContext;

pub fn execute(args: GraphArgs, ctx: &GlobalContext) -> Result<()> {
    let session = configure_project(ctx, &args.configure)?;
    let graph = &session.configuration.graph;

    if args.dot {
        print!("{}", graph.to_dot());
        return Ok(());
    }

    for target in graph.targets() {
        let origin = match &target.variant {
            Some(variant) => format!("variant {}", variant),
            None => "base".to_string(),
        };
        println!("lib{} ({}, linked by {})", target.name, origin, target.link_language());

        for source in &target.sources {
            println!("├── {} [{}]", source.path.display(), source.language);
        }
        for dep in &target.dependencies {
            let locator = dep
                .locator
                .as_ref()
                .map(|l| l.to_string())
                .unwrap_or_default();
            println!("└── {} {}", dep.id, locator);
        }
    }

    let inactive: Vec<_> = session.configuration.variants.inactive().collect();
    if !inactive.is_empty() {
        println!();
        for status in inactive {
            let reason = status
                .reason
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_default();
            println!("(variant {} inactive: {})", status.name, reason);
        }
    }

    Ok(())
}
