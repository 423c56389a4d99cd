#![no_main]

use libfuzzer_sys::fuzz_target;
use trackdeck::audio::NullEngine;
use trackdeck::catalog::Catalog;
use trackdeck::controller::PlaybackController;
use trackdeck::events;
use trackdeck::shuffle::ShuffleSequencer;

fuzz_target!(|data: &[u8]| {
    let catalog = Catalog::builtin("fuzz-assets-that-do-not-exist");
    let len = catalog.len();
    let (sender, rx) = events::channel();
    let seed = data.first().copied().map_or(0, u64::from);
    let mut controller = PlaybackController::new(
        catalog,
        NullEngine::new(sender),
        ShuffleSequencer::seeded(len, seed),
    );

    for byte in data {
        match byte % 12 {
            0 => controller.play(),
            1 => controller.pause(),
            2 => controller.stop(),
            3 => controller.next(),
            4 => controller.previous(),
            5 => controller.set_shuffle(!controller.shuffle_enabled()),
            6 => controller.set_loop(!controller.loop_enabled()),
            7 => controller.on_engine_end_of_stream(),
            8 => controller.seek_relative(f64::from(*byte) - 128.0),
            9 => controller.seek_to_fraction(f64::from(*byte) / 255.0),
            10 => {
                let _ = controller.select_track(usize::from(*byte) % (len + 1));
            }
            _ => controller.on_position_update(f64::from(*byte), 200.0),
        }
        for event in rx.try_iter() {
            controller.handle_event(event);
        }
        assert!(controller.current_index() < len);
    }
    let _ = controller.drain_notices();
});
