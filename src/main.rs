//! Scene Layout demo entry point
//!
//! Native: composes a scene, then replays a seeded random walk of signal
//! commits on the same pool and prints each result as text.
//! The browser build is driven through `platform::web`.

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use clap::Parser;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use scene_layout::layout::{CellRect, Composition};
    use scene_layout::{ComposeRequest, Mode, ModeFlags, SceneContext, SceneEngine, Viewport};

    const TARGET: &str = "demo";

    #[derive(Parser, Debug)]
    #[command(author, version, about = "Compose a scene and replay a seeded signal walk", long_about = None)]
    struct Args {
        /// Starting control signal (clamped to 0..1)
        #[arg(default_value_t = 0.5)]
        signal: f64,

        /// Viewport width in pixels
        #[arg(default_value_t = 1280.0)]
        width: f64,

        /// Viewport height in pixels
        #[arg(default_value_t = 800.0)]
        height: f64,

        /// Composition mode: start, questionnaire or overlay
        #[arg(default_value = "start", value_parser = parse_mode)]
        mode: Mode,

        /// Seed for the signal walk
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Number of signal commits after the first pass
        #[arg(long, default_value_t = 6)]
        steps: usize,
    }

    fn parse_mode(s: &str) -> Result<Mode, String> {
        Mode::from_str(s).ok_or_else(|| format!("unknown mode `{s}`"))
    }

    impl Args {
        fn request(&self, signal: f64) -> ComposeRequest {
            let flags = ModeFlags {
                questionnaire_open: self.mode == Mode::Questionnaire,
                overlay: self.mode == Mode::Overlay,
            };
            ComposeRequest::new(signal, Viewport::new(self.width, self.height), flags)
        }
    }

    pub fn run() {
        let args = Args::parse();

        let engine = match SceneEngine::with_defaults() {
            Ok(engine) => engine,
            Err(e) => {
                log::error!("Failed to build engine: {e}");
                std::process::exit(1);
            }
        };

        let mut ctx = SceneContext::new();
        ctx.mount(TARGET, engine);

        let mut rng = Pcg32::seed_from_u64(args.seed);
        let mut signal = args.signal.clamp(0.0, 1.0);
        for step in 0..=args.steps {
            if step > 0 {
                signal = (signal + rng.random_range(-0.25..=0.25)).clamp(0.0, 1.0);
            }
            let Some(composition) = ctx.recompose(TARGET, &args.request(signal)) else {
                return;
            };
            println!("== step {step}: t={signal:.3} ==");
            print_summary(composition);
            print_grid(composition);
            println!();
        }
    }

    fn print_summary(c: &Composition) {
        let m = &c.meta;
        println!(
            "{} / {}: {}x{} cells of {:.1}px (usable rows {}), salt {:#010x}",
            m.mode, m.device, m.geometry.rows, m.geometry.cols, m.geometry.cell, m.geometry.used_rows, m.salt
        );
        println!(
            "placed {}/{}  reassigned {}  fallback {}  dropped {}  landmark forced {:?}",
            c.placed.len(),
            c.pool.len(),
            m.reassigned,
            m.fallback_placed,
            m.dropped,
            m.landmark_forced
        );
    }

    fn print_grid(c: &Composition) {
        let g = c.meta.geometry;
        if g.is_degenerate() {
            println!("(empty grid)");
            return;
        }
        let mut rows: Vec<Vec<char>> = (0..g.rows)
            .map(|r| {
                (0..g.cols)
                    .map(|col| {
                        if c.meta.grid_spec.is_forbidden(r, col, g.cols) {
                            'x'
                        } else if r >= g.used_rows {
                            '~'
                        } else {
                            ' '
                        }
                    })
                    .collect()
            })
            .collect();
        for item in &c.placed {
            let CellRect { row0, col0, w, h } = item.rect;
            for r in row0..row0 + h {
                for col in col0..col0 + w {
                    rows[r as usize][col as usize] = item.variant.glyph();
                }
            }
        }
        let border: String = "-".repeat(g.cols as usize);
        println!("+{border}+");
        for row in rows {
            println!("|{}|", row.into_iter().collect::<String>());
        }
        println!("+{border}+");
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_args_defaults() {
            let args = Args::try_parse_from(["scene-layout"]).unwrap();
            assert_eq!((args.signal, args.width, args.height), (0.5, 1280.0, 800.0));
            assert_eq!(args.mode, Mode::Start);
            assert_eq!((args.seed, args.steps), (42, 6));
        }

        #[test]
        fn test_args_positional_and_flags() {
            let args =
                Args::try_parse_from(["scene-layout", "0.3", "900", "700", "overlay", "--seed", "7"]).unwrap();
            assert_eq!((args.signal, args.width, args.height), (0.3, 900.0, 700.0));
            assert_eq!(args.mode, Mode::Overlay);
            assert_eq!(args.seed, 7);
            let req = args.request(0.3);
            assert!(req.flags.overlay);
            assert!(!req.flags.questionnaire_open);
        }

        #[test]
        fn test_args_reject_unknown_mode() {
            assert!(Args::try_parse_from(["scene-layout", "0.3", "900", "700", "sideways"]).is_err());
            assert!(Args::try_parse_from(["scene-layout", "not-a-number"]).is_err());
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Scene layout (native) starting...");
    demo::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::web::start, this is just to satisfy the compiler
}
