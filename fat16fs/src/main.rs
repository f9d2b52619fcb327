// Copyright 2024 Kevin Ludwig
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod handlers;
mod inodes;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use fat16_fat::{FatFileSystem, DISK_SIZE};
use fat16_store_mmap::MmapStore;
use log::info;

use handlers::Fat16Fuse;

/// Userspace FAT16 filesystem driver, exposed over FUSE.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to the backing image file. Created and formatted if it does not exist.
    #[arg(long)]
    image: PathBuf,

    /// Directory to mount the filesystem on.
    mountpoint: PathBuf,

    /// Stay in the foreground instead of daemonizing.
    #[arg(short, long)]
    foreground: bool,

    /// Extra FUSE mount options (e.g. `-o allow_other`).
    #[arg(short = 'o', long = "option")]
    options: Vec<String>,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.verbosity.log_level_filter())
        .init();

    let (store, fresh) = MmapStore::open(&cli.image, DISK_SIZE)
        .with_context(|| format!("opening image {}", cli.image.display()))?;
    if fresh {
        info!("{} did not exist; formatting a new image", cli.image.display());
    }

    let fs = FatFileSystem::mount(store, fresh).context("mounting FAT16 image")?;
    let driver = Fat16Fuse::new(fs);

    let mut mount_options = vec![fuser::MountOption::FSName("fat16fs".to_string())];
    for opt in &cli.options {
        mount_options.push(parse_mount_option(opt));
    }
    if !cli.foreground {
        mount_options.push(fuser::MountOption::AutoUnmount);
    }

    info!("mounting {} on {}", cli.image.display(), cli.mountpoint.display());
    fuser::mount2(driver, &cli.mountpoint, &mount_options)
        .with_context(|| format!("mounting on {}", cli.mountpoint.display()))?;
    Ok(())
}

fn parse_mount_option(opt: &str) -> fuser::MountOption {
    match opt {
        "ro" => fuser::MountOption::RO,
        "rw" => fuser::MountOption::RW,
        "allow_other" => fuser::MountOption::AllowOther,
        "allow_root" => fuser::MountOption::AllowRoot,
        "auto_unmount" => fuser::MountOption::AutoUnmount,
        other => fuser::MountOption::CUSTOM(other.to_string()),
    }
}
