//! `berth flags` command

use anyhow::{anyhow, bail, Result};

use crate::cli::FlagsArgs;
use crate::commands::configure_project;
use berth::core::flags::{FlagPurpose, FlagSet};
use berth::core::Language;
use berth::util::GlobalContext;

pub fn execute(args: FlagsArgs, ctx: &GlobalContext) -> Result<()> {
    let language = args
        .lang
        .as_deref()
        .map(|s| s.parse::<Language>())
        .transpose()
        .map_err(|e| anyhow!("{}", e))?;

    let session = configure_project(ctx, &args.configure)?;
    let flags = &session.configuration.flags;

    if let Some(lang) = language {
        if !flags.contains_key(&lang) {
            bail!(
                "no {} toolchain is enabled\n\
                 help: set {} in berth.override.toml",
                lang,
                lang.compiler_override_key()
            );
        }
    }

    let purposes: &[FlagPurpose] = if args.compile {
        &[FlagPurpose::Compile]
    } else if args.link {
        &[FlagPurpose::Link]
    } else {
        &[FlagPurpose::Compile, FlagPurpose::Link]
    };

    let mut first = true;
    for (lang, set) in flags {
        if language.is_some_and(|l| l != *lang) {
            continue;
        }
        for purpose in purposes {
            if !first {
                println!();
            }
            first = false;
            print_flags(set, *purpose);
        }
    }

    Ok(())
}

fn print_flags(set: &FlagSet, purpose: FlagPurpose) {
    let label = match purpose {
        FlagPurpose::Compile => "Compile",
        FlagPurpose::Link => "Link",
    };
    println!("# {} flags for {}:", label, set.language());

    for (i, entry) in set.entries().iter().enumerate() {
        if entry.purpose != purpose {
            continue;
        }
        if set.is_superseded(i) {
            println!("  {}    # from: {} (superseded)", entry.token, entry.source);
        } else {
            println!("  {}    # from: {}", entry.token, entry.source);
        }
    }
}
