use super::{
    BlockSearch, CostMetric, LevelGeometry, RecalcParams, SearchParams, SearchType,
    context::{BlockLocation, MvBounds, SearchContext, SourceBlock},
    predictors::{PredictorSet, ScanPosition, fetch_predictors, median},
};
use crate::{
    data::{
        block::BlockSize,
        frame::{MvFrame, MvPlane},
        motion::MotionVector,
        sad::sad_fn,
    },
    error::ConfigError,
    field::{FieldGeometry, MotionField},
    test_utils::{plane_from_fn, texture},
};

const PAD: usize = 16;
const SIZE: usize = 48;

fn geometry() -> LevelGeometry {
    LevelGeometry {
        blk_x: 4,
        blk_y: 4,
        blk_size_x: 8,
        blk_size_y: 8,
        overlap_x: 0,
        overlap_y: 0,
        pel: 1,
        level: 0,
        xdec: 1,
        ydec: 1,
        chroma: false,
        metric: CostMetric::Sad,
        smallest_plane: true,
        bit_depth: 8,
    }
}

fn luma_frame(f: impl Fn(usize, usize) -> i32) -> MvFrame<u8> {
    let plane = plane_from_fn::<u8>(SIZE, SIZE, 0, 0, f);
    MvFrame {
        luma: MvPlane::from_plane(&plane, PAD, PAD, 1),
        chroma: None,
    }
}

fn chroma_frame(
    luma: impl Fn(usize, usize) -> i32,
    chroma: impl Fn(usize, usize) -> i32,
) -> MvFrame<u8> {
    let y = plane_from_fn::<u8>(SIZE, SIZE, 0, 0, luma);
    let c = plane_from_fn::<u8>(SIZE / 2, SIZE / 2, 1, 1, chroma);
    MvFrame {
        luma: MvPlane::from_plane(&y, PAD, PAD, 1),
        chroma: Some([
            MvPlane::from_plane(&c, PAD / 2, PAD / 2, 1),
            MvPlane::from_plane(&c, PAD / 2, PAD / 2, 1),
        ]),
    }
}

// The reference holds the source moved by `(dx, dy)`, so every source block
// matches the reference block displaced by `(dx, dy)`.
fn shifted_frames(dx: i32, dy: i32) -> (MvFrame<u8>, MvFrame<u8>) {
    let src = luma_frame(|x, y| texture(x as i32, y as i32));
    let reference = luma_frame(|x, y| texture(x as i32 - dx, y as i32 - dy));
    (src, reference)
}

fn naive_sad(
    src: &MvFrame<u8>,
    reference: &MvFrame<u8>,
    blkx: usize,
    blky: usize,
    mv: MotionVector,
) -> f32 {
    let (x0, y0) = (PAD + blkx * 8, PAD + blky * 8);
    let a = src.luma.region(x0, y0, 8, 8);
    let b = reference.luma.region(
        (x0 as i32 + mv.x) as usize,
        (y0 as i32 + mv.y) as usize,
        8,
        8,
    );
    a.rows_iter()
        .zip(b.rows_iter())
        .flat_map(|(ra, rb)| ra.iter().zip(rb))
        .map(|(&p, &q)| (i32::from(p) - i32::from(q)).unsigned_abs())
        .sum::<u32>() as f32
}

fn assert_uniform(field: &MotionField, x: i32, y: i32) {
    for (idx, mv) in field.vectors().iter().enumerate() {
        assert_eq!((x, y), (mv.x, mv.y), "block {}", idx);
        assert_eq!(0.0, mv.cost, "block {}", idx);
    }
}

#[test]
fn median_of_three() {
    assert_eq!(2, median(1, 2, 3));
    assert_eq!(2, median(3, 1, 2));
    assert_eq!(-4, median(-4, -4, 7));
    assert_eq!(0, median(5, -5, 0));
}

#[test]
fn search_type_flags() {
    assert_eq!(Some(SearchType::HEX2), SearchType::from_index(4));
    assert_eq!(Some(SearchType::ONETIME), SearchType::from_index(0));
    assert_eq!(None, SearchType::from_index(8));

    let both = SearchType::HSEARCH | SearchType::VSEARCH;
    assert!(both.contains(SearchType::VSEARCH));
    assert!(!both.contains(SearchType::HEX2));
    assert!(both.is_directional());
    assert!(!(SearchType::HEX2 | SearchType::HSEARCH).is_directional());
    assert!(!SearchType::default().is_directional());
}

#[test]
fn every_algorithm_finds_translation() {
    let cases = [
        (SearchType::ONETIME, (2, 0)),
        (SearchType::NSTEP, (2, 0)),
        (SearchType::LOGARITHMIC, (2, 0)),
        (SearchType::EXHAUSTIVE, (2, 0)),
        (SearchType::HEX2, (2, 0)),
        (SearchType::UMH, (2, 0)),
        (SearchType::HSEARCH, (2, 0)),
        (SearchType::VSEARCH, (0, 2)),
    ];

    for (search_type, (dx, dy)) in cases {
        let (src, reference) = shifted_frames(dx, dy);
        let mut search = BlockSearch::<u8>::new(geometry()).unwrap();
        let params = SearchParams {
            search_type,
            search_param: 2,
            ..Default::default()
        };
        let stats = search.search_mvs(&src, &reference, &params);

        assert_uniform(search.field(), dx, dy);
        assert_eq!(0.0, stats.plane_sad, "{:?}", search_type);
        assert_eq!(0, stats.bad_blocks, "{:?}", search_type);
    }
}

#[test]
fn try_many_finds_translation() {
    let (src, reference) = shifted_frames(2, 0);
    let mut search = BlockSearch::<u8>::new(geometry()).unwrap();
    let params = SearchParams {
        search_type: SearchType::HEX2,
        try_many: true,
        ..Default::default()
    };
    search.search_mvs(&src, &reference, &params);

    assert_uniform(search.field(), 2, 0);
}

#[test]
fn satd_metric_finds_translation() {
    let (src, reference) = shifted_frames(-1, 2);
    let mut search = BlockSearch::<u8>::new(LevelGeometry {
        metric: CostMetric::Satd,
        ..geometry()
    })
    .unwrap();
    let params = SearchParams {
        search_type: SearchType::EXHAUSTIVE,
        ..Default::default()
    };
    search.search_mvs(&src, &reference, &params);

    assert_uniform(search.field(), -1, 2);
}

#[test]
fn final_cost_never_exceeds_seeds() {
    let (src, reference) = shifted_frames(3, -1);
    let mut search = BlockSearch::<u8>::new(LevelGeometry {
        smallest_plane: false,
        ..geometry()
    })
    .unwrap();
    let direct = MotionVector::new(1, 1, 0.0);
    for idx in 0..search.field().blk_count() {
        search.field_mut().set(idx, direct);
    }
    let global = MotionVector::new(-1, 0, 0.0);
    let params = SearchParams {
        search_type: SearchType::LOGARITHMIC,
        search_param: 1,
        lambda: 800.0,
        penalty_new: 30.0,
        global_mv: global,
        ..Default::default()
    };
    search.search_mvs(&src, &reference, &params);

    for blky in 0..4 {
        for blkx in 0..4 {
            let mv = search.field().get(blky * 4 + blkx);
            let sad = |v| naive_sad(&src, &reference, blkx, blky, v);
            assert!(mv.cost <= sad(MotionVector::ZERO));
            assert!(mv.cost <= sad(global));
            assert!(mv.cost <= sad(direct));
            // the recorded cost is the raw distortion at the recorded vector
            assert_eq!(sad(mv), mv.cost);
        }
    }
}

#[test]
fn vectors_stay_within_bounds() {
    // Far beyond the padding on the right: wide searches hit the bounds.
    let (src, reference) = shifted_frames(40, 30);
    let mut search = BlockSearch::<u8>::new(geometry()).unwrap();
    let params = SearchParams {
        search_type: SearchType::EXHAUSTIVE,
        search_param: 4,
        bad_sad: 1.0,
        bad_range: 24,
        ..Default::default()
    };
    let stats = search.search_mvs(&src, &reference, &params);
    assert!(stats.bad_blocks > 0);

    for blky in 0..4 {
        for blkx in 0..4 {
            let mv = search.field().get(blky * 4 + blkx);
            let (bx, by) = ((blkx * 8) as i32, (blky * 8) as i32);
            let (w, pad) = (SIZE as i32, PAD as i32);
            assert!(mv.x >= -(bx + pad) && mv.x < w - bx - 8 + pad, "{:?}", mv);
            assert!(mv.y >= -(by + pad) && mv.y < w - by - 8 + pad, "{:?}", mv);
        }
    }
}

#[test]
fn wide_search_rescues_bad_blocks() {
    // Vertical motion that a horizontal-only search cannot follow.
    let (src, reference) = shifted_frames(0, 7);
    let run = |bad_range| {
        let mut search = BlockSearch::<u8>::new(geometry()).unwrap();
        let params = SearchParams {
            search_type: SearchType::HSEARCH,
            search_param: 1,
            bad_sad: 1.0,
            bad_range,
            ..Default::default()
        };
        let stats = search.search_mvs(&src, &reference, &params);
        (search, stats)
    };

    let (plain, plain_stats) = run(0);
    let (rings, rings_stats) = run(-10);
    assert!(plain.field().vectors().iter().all(|mv| mv.y == 0));
    assert!(rings_stats.bad_blocks > 0);
    assert!(rings.field().vectors()[2..].iter().any(|mv| mv.y > 0));
    assert!(rings_stats.plane_sad < plain_stats.plane_sad);
}

fn context<'a>(src: &'a MvFrame<u8>, reference: &'a MvFrame<u8>) -> SearchContext<'a, u8> {
    let (x0, y0) = (PAD + 8, PAD + 8);
    let sad = sad_fn::<u8>(BlockSize::BLOCK_8X8);
    let mut ctx = SearchContext::new(
        SourceBlock {
            luma: src.luma.region(x0, y0, 8, 8),
            chroma: None,
        },
        reference,
        BlockLocation {
            x: x0 as i32,
            y: y0 as i32,
            cx: 0,
            cy: 0,
            xdec: 1,
            ydec: 1,
        },
        sad,
        sad,
        MvBounds {
            dx_min: -24,
            dx_max: 48,
            dy_min: -24,
            dy_max: 48,
        },
        0.0,
        0.0,
    );
    ctx.best = MotionVector::ZERO.with_cost(ctx.block_cost(0, 0));
    ctx.min_cost = ctx.best.cost;
    ctx
}

// Repeats `pass` until it stops improving, then checks that one more pass
// leaves the state untouched.
fn assert_idempotent(ctx: &mut SearchContext<'_, u8>, pass: impl Fn(&mut SearchContext<'_, u8>)) {
    let start = ctx.min_cost;
    loop {
        let before = ctx.best;
        pass(&mut *ctx);
        if ctx.best == before {
            break;
        }
    }
    assert!(ctx.min_cost <= start);

    let (best, cost) = (ctx.best, ctx.min_cost);
    pass(&mut *ctx);
    assert_eq!(best, ctx.best);
    assert_eq!(cost, ctx.min_cost);
}

#[test]
fn diamond_is_idempotent() {
    let (src, reference) = shifted_frames(5, -3);
    let mut ctx = context(&src, &reference);
    assert_idempotent(&mut ctx, |ctx| ctx.diamond_search(2));
}

#[test]
fn hex2_is_idempotent() {
    let (src, reference) = shifted_frames(-4, 6);
    let mut ctx = context(&src, &reference);
    assert_idempotent(&mut ctx, |ctx| ctx.hex2_search(4));
}

#[test]
fn candidates_outside_bounds_are_ignored() {
    let (src, reference) = shifted_frames(0, 0);
    let mut ctx = context(&src, &reference);
    ctx.min_cost = f32::INFINITY;

    assert!(!ctx.check_mv(48, 0));
    assert!(!ctx.check_mv(0, -25));
    assert!(ctx.check_mv(47, -24));
    assert_eq!(MotionVector::new(0, 0, 0.0), ctx.clip_mv(MotionVector::ZERO));
    assert_eq!((47, -24), {
        let mv = ctx.clip_mv(MotionVector::new(100, -100, 0.0));
        (mv.x, mv.y)
    });
}

// Block `idx` of a 4x4 field holds `(idx, -idx)` with cost `10 * idx`.
fn numbered_field() -> MotionField {
    let mut field = MotionField::new(geometry().field_geometry());
    for idx in 0..field.blk_count() {
        field.set(idx, MotionVector::new(idx as i32, -(idx as i32), (idx * 10) as f32));
    }
    field
}

const fn scan(blkx: usize, blky: usize, scan_dir: isize) -> ScanPosition {
    ScanPosition {
        blkx,
        blky,
        blk_x: 4,
        blk_y: 4,
        scan_dir,
    }
}

const FIELD_SHIFTED_ZERO: MotionVector = MotionVector::new(0, 2, 0.0);

fn spatial_predictors(
    ctx: &mut SearchContext<'_, u8>,
    field: &MotionField,
    pos: ScanPosition,
) -> PredictorSet {
    fetch_predictors(ctx, field, pos, FIELD_SHIFTED_ZERO, None, false, 400.0)
}

#[test]
fn predictors_follow_scan_direction() {
    let (src, reference) = shifted_frames(0, 0);
    let mut ctx = context(&src, &reference);
    let field = numbered_field();
    let at = |idx: usize| field.get(idx);

    // Left to right: the diagonal is the coarse prediction below and ahead.
    let predictors = spatial_predictors(&mut ctx, &field, scan(1, 1, 1));
    assert_eq!(
        &[MotionVector::new(4, -4, 100.0), at(4), at(1), at(10)][..],
        &predictors[..]
    );

    // Right to left the left neighbor is the block on the right.
    let predictors = spatial_predictors(&mut ctx, &field, scan(1, 1, -1));
    assert_eq!(
        &[MotionVector::new(6, -6, 80.0), at(6), at(1), at(8)][..],
        &predictors[..]
    );

    let temporal = MotionVector::new(3, 3, 5.0);
    let predictors = fetch_predictors(
        &mut ctx,
        &field,
        scan(1, 1, 1),
        FIELD_SHIFTED_ZERO,
        Some(temporal),
        false,
        400.0,
    );
    assert_eq!(5, predictors.len());
    assert_eq!(temporal, predictors[4]);
}

#[test]
fn diagonal_predictor_fallbacks() {
    let (src, reference) = shifted_frames(0, 0);
    let mut ctx = context(&src, &reference);
    let field = numbered_field();
    let mut diagonal = |pos: ScanPosition| spatial_predictors(&mut ctx, &field, pos)[3];

    assert_eq!(field.get(10), diagonal(scan(1, 1, 1)));
    // The last row has nothing below, so the block above and ahead is used.
    assert_eq!(field.get(10), diagonal(scan(1, 3, 1)));
    assert_eq!(field.get(8), diagonal(scan(1, 3, -1)));
    // Nothing ahead at the end of the row.
    assert_eq!(FIELD_SHIFTED_ZERO, diagonal(scan(3, 1, 1)));
    assert_eq!(FIELD_SHIFTED_ZERO, diagonal(scan(0, 1, -1)));
    assert_eq!(FIELD_SHIFTED_ZERO, diagonal(scan(3, 3, 1)));
}

#[test]
fn first_row_median_is_left() {
    let (src, reference) = shifted_frames(0, 0);
    let mut ctx = context(&src, &reference);
    let field = numbered_field();

    let predictors = spatial_predictors(&mut ctx, &field, scan(2, 0, 1));
    assert_eq!(field.get(1), predictors[0]);
    assert_eq!(field.get(1), predictors[1]);
    assert_eq!(FIELD_SHIFTED_ZERO, predictors[2]);
    assert_eq!(field.get(7), predictors[3]);

    // No left neighbor at the start of the row either.
    let predictors = spatial_predictors(&mut ctx, &field, scan(0, 0, 1));
    assert_eq!(FIELD_SHIFTED_ZERO, predictors[0]);
    assert_eq!(FIELD_SHIFTED_ZERO, predictors[1]);
}

#[test]
fn median_cost_is_the_largest() {
    let (src, reference) = shifted_frames(0, 0);
    let mut ctx = context(&src, &reference);
    let mut field = numbered_field();
    field.set(1, MotionVector::new(1, -1, 500.0));

    let predictors = spatial_predictors(&mut ctx, &field, scan(1, 1, 1));
    assert_eq!(MotionVector::new(4, -4, 500.0), predictors[0]);

    // Predictors are clamped into the legal range.
    field.set(1, MotionVector::new(100, -100, 0.0));
    let predictors = spatial_predictors(&mut ctx, &field, scan(1, 1, 1));
    assert_eq!(MotionVector::new(47, -24, 0.0), predictors[2]);
}

#[test]
fn lambda_is_damped_by_predictor_cost() {
    let (src, reference) = shifted_frames(0, 0);
    let mut ctx = context(&src, &reference);
    let field = numbered_field();
    let pos = scan(1, 1, 1);

    ctx.lambda = 100.0;
    ctx.predictor = MotionVector::new(0, 0, 400.0);
    fetch_predictors(&mut ctx, &field, pos, FIELD_SHIFTED_ZERO, None, false, 400.0);
    let damping = 400.0f32 / 600.0;
    assert_eq!(100.0 * (damping * damping), ctx.lambda);
    assert_eq!(MotionVector::new(0, 0, 400.0), ctx.predictor);

    // On the coarsest plane the median replaces the direct predictor first.
    ctx.lambda = 100.0;
    fetch_predictors(&mut ctx, &field, pos, FIELD_SHIFTED_ZERO, None, true, 400.0);
    assert_eq!(MotionVector::new(4, -4, 100.0), ctx.predictor);
    let damping = 400.0f32 / 450.0;
    assert_eq!(100.0 * (damping * damping), ctx.lambda);

    ctx.lambda = 100.0;
    ctx.predictor = MotionVector::ZERO;
    fetch_predictors(&mut ctx, &field, pos, FIELD_SHIFTED_ZERO, None, false, 0.0);
    assert_eq!(100.0, ctx.lambda);

    ctx.predictor = MotionVector::new(0, 0, 400.0);
    fetch_predictors(&mut ctx, &field, pos, FIELD_SHIFTED_ZERO, None, false, 0.0);
    assert_eq!(0.0, ctx.lambda);
}

fn old_field(size: usize, blk: usize) -> MotionField {
    let mut field = MotionField::new(FieldGeometry {
        blk_x: blk,
        blk_y: blk,
        blk_size_x: size,
        blk_size_y: size,
        overlap_x: 0,
        overlap_y: 0,
        pel: 1,
        level: 0,
    });
    for idx in 0..field.blk_count() {
        let (x, y) = ((idx % blk) as i32, (idx / blk) as i32);
        field.set(idx, MotionVector::new(x, -y, (idx * 10) as f32));
    }
    field
}

#[test]
fn nearest_projection_picks_one_old_vector() {
    let search = BlockSearch::<u8>::new(geometry()).unwrap();
    let old = old_field(4, 8);

    for blky in 0..4 {
        for blkx in 0..4 {
            let projected = search.project_old_vector(&old, blkx, blky, false);
            let expected = old.get((2 * blky + 1) * 8 + 2 * blkx + 1);
            assert_eq!(expected.x, projected.x);
            assert_eq!(expected.y, projected.y);
            assert_eq!(expected.cost * 4.0, projected.cost);
        }
    }
}

#[test]
fn smooth_projection_blends_old_vectors() {
    let search = BlockSearch::<u8>::new(geometry()).unwrap();
    let old = old_field(4, 8);

    // Center 4 lies halfway between the old centers 2 and 6.
    let projected = search.project_old_vector(&old, 0, 0, true);
    assert_eq!(0, projected.x);
    assert_eq!(0, projected.y);
    // mean of the costs 0, 10, 80 and 90, scaled by 64 / 16
    assert_eq!(180.0, projected.cost);
}

#[test]
fn smooth_projection_rounds_each_axis() {
    let search = BlockSearch::<u8>::new(geometry()).unwrap();
    let mut old = MotionField::new(FieldGeometry {
        blk_x: 7,
        blk_y: 7,
        blk_size_x: 8,
        blk_size_y: 8,
        overlap_x: 2,
        overlap_y: 2,
        pel: 1,
        level: 0,
    });
    for idx in 0..old.blk_count() {
        old.set(idx, MotionVector::new(-3, -3, 60.0));
    }
    old.set(2 * 7 + 2, MotionVector::new(-2, -2, 60.0));

    // Center 12 sits 2 past the old center 10 on both axes. A single
    // weighted average would truncate -104 / 36 to -2.
    let projected = search.project_old_vector(&old, 1, 1, true);
    assert_eq!(MotionVector::new(-3, -3, 60.0), projected);
}

#[test]
fn recalculate_refines_costly_blocks() {
    let (src, reference) = shifted_frames(2, 0);
    let old = MotionField::new(FieldGeometry {
        blk_x: 2,
        blk_y: 2,
        blk_size_x: 16,
        blk_size_y: 16,
        overlap_x: 0,
        overlap_y: 0,
        pel: 1,
        level: 0,
    });
    let mut search = BlockSearch::<u8>::new(geometry()).unwrap();
    let params = RecalcParams {
        search_type: SearchType::EXHAUSTIVE,
        search_param: 2,
        th_sad: 0.0,
        ..Default::default()
    };
    let stats = search.recalculate_mvs(&old, &src, &reference, &params);

    assert_uniform(search.field(), 2, 0);
    assert_eq!(16, stats.bad_blocks);
}

#[test]
fn recalculate_keeps_cheap_blocks() {
    let (src, reference) = shifted_frames(2, 0);
    let old = old_field(16, 2);
    let mut search = BlockSearch::<u8>::new(geometry()).unwrap();
    let params = RecalcParams {
        th_sad: f32::MAX,
        ..Default::default()
    };
    let stats = search.recalculate_mvs(&old, &src, &reference, &params);
    assert_eq!(0, stats.bad_blocks);

    for blky in 0..4 {
        for blkx in 0..4 {
            let mv = search.field().get(blky * 4 + blkx);
            let projected = search.project_old_vector(&old, blkx, blky, true);
            assert_eq!((projected.x, projected.y), (mv.x, mv.y));
            // the cost is measured again rather than projected
            assert_eq!(naive_sad(&src, &reference, blkx, blky, mv), mv.cost);
        }
    }
}

#[test]
fn recalculate_keeps_old_vertical_offset() {
    let (src, reference) = shifted_frames(0, 1);
    let mut old = MotionField::new(FieldGeometry {
        blk_x: 2,
        blk_y: 2,
        blk_size_x: 16,
        blk_size_y: 16,
        overlap_x: 0,
        overlap_y: 0,
        pel: 1,
        level: 0,
    });
    for idx in 0..old.blk_count() {
        old.set(idx, MotionVector::new(0, 1, 0.0));
    }
    let mut search = BlockSearch::<u8>::new(geometry()).unwrap();
    let params = RecalcParams {
        th_sad: f32::MAX,
        ..Default::default()
    };
    let stats = search.recalculate_mvs(&old, &src, &reference, &params);

    assert_eq!(0, stats.bad_blocks);
    for mv in search.field().vectors() {
        assert_eq!((0, 1), (mv.x, mv.y));
    }
    assert!(search.field().vectors().iter().all(|mv| mv.cost == 0.0));
}

#[test]
fn rejects_invalid_configurations() {
    let err = |g: LevelGeometry| BlockSearch::<u8>::new(g).err();

    assert!(matches!(
        err(LevelGeometry {
            blk_size_x: 12,
            ..geometry()
        }),
        Some(ConfigError::BlockSize(_))
    ));
    assert!(matches!(
        err(LevelGeometry {
            overlap_x: 5,
            ..geometry()
        }),
        Some(ConfigError::Overlap { overlap: 5, size: 8 })
    ));
    assert!(matches!(
        err(LevelGeometry { pel: 3, ..geometry() }),
        Some(ConfigError::Pel(3))
    ));
    assert!(matches!(
        err(LevelGeometry { xdec: 2, ..geometry() }),
        Some(ConfigError::ChromaDecimation { xdec: 2, ydec: 1 })
    ));
    assert!(matches!(
        err(LevelGeometry {
            bit_depth: 7,
            ..geometry()
        }),
        Some(ConfigError::BitDepth(7))
    ));
    assert!(matches!(
        err(LevelGeometry {
            blk_size_y: 1,
            metric: CostMetric::Satd,
            ..geometry()
        }),
        Some(ConfigError::Satd(BlockSize::BLOCK_8X1))
    ));
    assert!(matches!(
        err(LevelGeometry {
            blk_size_y: 1,
            chroma: true,
            ..geometry()
        }),
        Some(ConfigError::BlockSize(_))
    ));
    assert!(BlockSearch::<u16>::new(LevelGeometry {
        chroma: true,
        bit_depth: 10,
        ..geometry()
    })
    .is_ok());

    // An odd step puts every other block between two chroma pixels.
    assert!(matches!(
        err(LevelGeometry {
            overlap_x: 1,
            chroma: true,
            ..geometry()
        }),
        Some(ConfigError::ChromaAlignment {
            what: "horizontal step",
            value: 7,
            ratio: 2,
        })
    ));
    assert!(matches!(
        err(LevelGeometry {
            overlap_y: 1,
            chroma: true,
            ..geometry()
        }),
        Some(ConfigError::ChromaAlignment {
            what: "vertical step",
            value: 7,
            ratio: 2,
        })
    ));
    assert!(BlockSearch::<u8>::new(LevelGeometry {
        overlap_x: 1,
        ..geometry()
    })
    .is_ok());
    assert!(BlockSearch::<u8>::new(LevelGeometry {
        overlap_y: 1,
        ydec: 0,
        chroma: true,
        ..geometry()
    })
    .is_ok());
}

#[test]
fn extreme_vectors_keep_chroma_inside_padding() {
    let src = chroma_frame(
        |x, y| texture(x as i32, y as i32),
        |x, y| texture(y as i32, x as i32),
    );
    let reference = chroma_frame(
        |x, y| texture(x as i32 + 3, y as i32),
        |x, y| texture(y as i32 - 1, x as i32 + 2),
    );
    let mut search = BlockSearch::<u8>::new(LevelGeometry {
        blk_x: 7,
        blk_y: 7,
        overlap_x: 2,
        overlap_y: 2,
        chroma: true,
        smallest_plane: false,
        ..geometry()
    })
    .unwrap();
    let params = SearchParams {
        search_type: SearchType::EXHAUSTIVE,
        search_param: 1,
        ..Default::default()
    };
    let pad = PAD as i32;

    // The coarse level predictions point far outside the frame, so every
    // block starts clamped against its bounds.
    for (px, py) in [(-1000, -1000), (1000, -1000), (-1000, 1000), (1000, 1000)] {
        for idx in 0..search.field().blk_count() {
            search
                .field_mut()
                .set(idx, MotionVector::new(px, py, 0.0));
        }
        search.search_mvs(&src, &reference, &params);

        for (idx, mv) in search.field().vectors().iter().enumerate() {
            let (bx, by) = ((idx % 7 * 6) as i32, (idx / 7 * 6) as i32);
            assert!((-(bx + pad)..SIZE as i32 - bx - 8 + pad).contains(&mv.x));
            assert!((-(by + pad)..SIZE as i32 - by - 8 + pad).contains(&mv.y));
        }
    }
}

#[test]
fn chroma_cost_follows_subsampled_motion() {
    // Luma moves by (2, -2), so chroma moves by (1, -1).
    let src = chroma_frame(
        |x, y| texture(x as i32, y as i32),
        |x, y| texture(y as i32, x as i32),
    );
    let reference = chroma_frame(
        |x, y| texture(x as i32 - 2, y as i32 + 2),
        |x, y| texture(y as i32 + 1, x as i32 - 1),
    );
    let mut search = BlockSearch::<u8>::new(LevelGeometry {
        chroma: true,
        ..geometry()
    })
    .unwrap();
    let params = SearchParams {
        search_type: SearchType::EXHAUSTIVE,
        search_param: 4,
        ..Default::default()
    };
    search.search_mvs(&src, &reference, &params);

    // The top row matches against replicated edge rows.
    for blky in 1..4 {
        for blkx in 0..4 {
            let mv = search.field().get(blky * 4 + blkx);
            assert_eq!((2, -2), (mv.x, mv.y), "block {} {}", blkx, blky);
            assert_eq!(0.0, mv.cost, "block {} {}", blkx, blky);
        }
    }
}
