use anyhow::Result;

use dir_sort::Config;
use dir_sort::config::DirSortConfig;

use crate::Args;

/// Create config from given command line args and user config file.
pub fn from_args(args: Args) -> Result<Config> {
    let user_config = DirSortConfig::get_user_config()?;
    let cli = DirSortConfig {
        auto: args.yes,
        debug: args.debug,
        directories: args.directories,
        dryrun: args.simulate,
        exclude: args.exclude,
        factor: args.factor,
        files: args.files,
        include: args.include,
        log: args.log,
        prefix: args.prefix,
        verbose: args.verbose,
    };
    Config::from_parts(&args.paths, user_config, cli)
}
