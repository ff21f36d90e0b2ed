use chrono::Duration;
use proptest::prelude::*;
use resource_gantt::engine::overlap::resolve_row;
use resource_gantt::engine::Geometry;
use resource_gantt::model::{calendar, TimeScale, ViewMode};

const ROW_Y: f64 = 80.0;
const FULL: f64 = 20.0;

fn mode() -> impl Strategy<Value = ViewMode> {
    (0..ViewMode::ALL.len()).prop_map(|i| ViewMode::ALL[i])
}

fn run(bars: &mut [Geometry]) -> bool {
    let mut refs: Vec<&mut Geometry> = bars.iter_mut().collect();
    resolve_row(ROW_Y, FULL, &mut refs)
}

proptest! {
    #[test]
    fn instants_survive_pixel_round_trip(
        mode in mode(),
        millis in 0i64..400 * 86_400_000,
        offset in 0.0f64..600.0,
    ) {
        let start = calendar::parse("2024-01-01").unwrap();
        let scale = TimeScale::covering(mode, start, start + Duration::days(400), offset);
        let t = scale.axis_start + Duration::milliseconds(millis);
        prop_assert_eq!(scale.x_to_time(scale.time_to_x(t)), t);
    }

    #[test]
    fn pixels_survive_time_round_trip(mode in mode(), x in 0.0f64..50_000.0) {
        let start = calendar::parse("2024-06-01 06:00").unwrap();
        let scale = TimeScale::covering(mode, start, start + Duration::days(30), 0.0);
        // One millisecond of rounding, expressed in pixels.
        let ms_px = scale.column_width / scale.step_millis();
        prop_assert!((scale.time_to_x(scale.x_to_time(x)) - x).abs() <= ms_px);
    }

    #[test]
    fn overlap_layout_converges(spans in prop::collection::vec((0.0f64..500.0, 1.0f64..150.0), 0..10)) {
        let mut bars: Vec<Geometry> = spans
            .iter()
            .map(|&(x, w)| Geometry::new(x, ROW_Y, w, FULL))
            .collect();
        run(&mut bars);
        let settled = bars.clone();
        prop_assert!(!run(&mut bars));
        prop_assert_eq!(&settled, &bars);

        for (i, b) in bars.iter().enumerate() {
            let alone = bars
                .iter()
                .enumerate()
                .all(|(j, o)| j == i || !b.overlaps_x(o));
            if alone {
                prop_assert_eq!((b.y, b.height), (ROW_Y, FULL));
            } else {
                prop_assert_eq!(b.height, FULL / 2.0);
                prop_assert!(b.y == ROW_Y || b.y == ROW_Y + FULL / 2.0);
            }
        }
    }
}
