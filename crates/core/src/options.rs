//! Option resolution across configuration layers.
//!
//! Every run resolves one effective value per recognized option by
//! walking four layers in precedence order: CLI arguments, per-job
//! overrides, job-file global settings, and the user defaults file.
//! Options absent at every layer take a built-in default.

use batchencode_config::Options;

/// Fully-resolved option values for one job.
///
/// Derived state: recomputed fresh for every job run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveOptions {
    pub decomb: bool,
    pub no_sleep: bool,
    pub disable_auto_burn: bool,
    pub burn_subtitle_num: Option<u32>,
    pub add_subtitle: Option<String>,
    pub crop_params: Option<String>,
    pub quality: Option<String>,
    pub movie: bool,
    pub m4v: bool,
    pub chapters: Option<String>,
    pub archive: bool,
}

impl Default for EffectiveOptions {
    /// Built-in defaults: auto-burn enabled, m4v container, archiving on,
    /// everything else off or unset.
    fn default() -> Self {
        Self {
            decomb: false,
            no_sleep: false,
            disable_auto_burn: false,
            burn_subtitle_num: None,
            add_subtitle: None,
            crop_params: None,
            quality: None,
            movie: false,
            m4v: true,
            chapters: None,
            archive: true,
        }
    }
}

/// Pick the highest-precedence value for one key across the layers,
/// highest first.
fn pick<T: Clone>(layers: [&Option<T>; 4]) -> Option<T> {
    layers.iter().find_map(|layer| (*layer).clone())
}

/// Resolve the effective options for one job.
///
/// Precedence, highest to lowest: `cli` > `job` > `global` > `user`,
/// falling through to the built-in default when a key is absent at every
/// layer. There are no error conditions.
pub fn resolve(cli: &Options, job: &Options, global: &Options, user: &Options) -> EffectiveOptions {
    let builtin = EffectiveOptions::default();
    EffectiveOptions {
        decomb: pick([&cli.decomb, &job.decomb, &global.decomb, &user.decomb])
            .unwrap_or(builtin.decomb),
        no_sleep: pick([&cli.no_sleep, &job.no_sleep, &global.no_sleep, &user.no_sleep])
            .unwrap_or(builtin.no_sleep),
        disable_auto_burn: pick([
            &cli.disable_auto_burn,
            &job.disable_auto_burn,
            &global.disable_auto_burn,
            &user.disable_auto_burn,
        ])
        .unwrap_or(builtin.disable_auto_burn),
        burn_subtitle_num: pick([
            &cli.burn_subtitle_num,
            &job.burn_subtitle_num,
            &global.burn_subtitle_num,
            &user.burn_subtitle_num,
        ]),
        add_subtitle: pick([
            &cli.add_subtitle,
            &job.add_subtitle,
            &global.add_subtitle,
            &user.add_subtitle,
        ]),
        crop_params: pick([
            &cli.crop_params,
            &job.crop_params,
            &global.crop_params,
            &user.crop_params,
        ]),
        quality: pick([&cli.quality, &job.quality, &global.quality, &user.quality]),
        movie: pick([&cli.movie, &job.movie, &global.movie, &user.movie]).unwrap_or(builtin.movie),
        m4v: pick([&cli.m4v, &job.m4v, &global.m4v, &user.m4v]).unwrap_or(builtin.m4v),
        chapters: pick([&cli.chapters, &job.chapters, &global.chapters, &user.chapters]),
        archive: pick([&cli.archive, &job.archive, &global.archive, &user.archive])
            .unwrap_or(builtin.archive),
    }
}
