use super::*;
use crate::context::state::PaintState;

fn run(json: &str) -> GfxResult<Arc<BufferedSurface>> {
    Script::from_json_str(json)?.run(Arc::new(PipeRegistry::default()))
}

#[test]
fn parses_tagged_commands() {
    let script = Script::from_json_str(
        r##"{
            "width": 8,
            "height": 4,
            "background": "#ffffff",
            "commands": [
                {"op": "set_color", "color": "#ff0000"},
                {"op": "fill_rect", "x": 0, "y": 0, "w": 2, "h": 2},
                {"op": "set_composite", "rule": "src_over", "alpha": 0.5},
                {"op": "set_hint", "hint": {"key": "antialiasing", "value": "on"}},
                {"op": "draw_round_rect", "x": 1, "y": 1, "w": 4, "h": 2, "arc_w": 2, "arc_h": 2},
                {"op": "fill_path", "path": "M0 0 L4 0 L0 4 Z"}
            ]
        }"##,
    )
    .unwrap();
    assert_eq!(script.model, ColorModel::IntArgb);
    assert_eq!(script.background, Some(Color::WHITE));
    assert_eq!(
        script.commands[1],
        Command::FillRect(Area {
            x: 0,
            y: 0,
            w: 2,
            h: 2
        })
    );
    assert_eq!(
        script.commands[2],
        Command::SetComposite {
            rule: Rule::SrcOver,
            alpha: 0.5
        }
    );
    assert!(script.commands[0].is_state_change());
    assert!(!script.commands[1].is_state_change());
    assert!(!script.commands[4].is_state_change());
}

#[test]
fn unknown_fields_and_ops_are_rejected() {
    let err = Script::from_json_str(r#"{"width": 1, "height": 1, "commands": [], "extra": 1}"#)
        .unwrap_err();
    assert!(matches!(err, GfxError::IllegalArgument(_)));
    assert!(
        Script::from_json_str(r#"{"width": 1, "height": 1, "commands": [{"op": "explode"}]}"#)
            .is_err()
    );
}

#[test]
fn zero_or_huge_dimensions_are_rejected() {
    assert!(Script::from_json_str(r#"{"width": 0, "height": 1, "commands": []}"#).is_err());
    assert!(Script::from_json_str(r#"{"width": 1, "height": 99999, "commands": []}"#).is_err());
}

#[test]
fn image_pixel_count_must_match() {
    let err = Script::from_json_str(
        r##"{"width": 4, "height": 4, "commands": [],
            "images": {"tile": {"width": 2, "height": 2, "pixels": ["#ff0000"]}}}"##,
    )
    .unwrap_err();
    assert!(err.to_string().contains("tile"));
}

#[test]
fn run_draws_onto_background() {
    let out = run(
        r##"{
            "width": 8,
            "height": 8,
            "background": "#ffffff",
            "commands": [
                {"op": "set_color", "color": "#0000ff"},
                {"op": "fill_rect", "x": 2, "y": 2, "w": 3, "h": 3},
                {"op": "draw_line", "x1": 0, "y1": 7, "x2": 7, "y2": 7}
            ]
        }"##,
    )
    .unwrap();
    assert_eq!(out.argb(0, 0), Some(0xffff_ffff));
    assert_eq!(out.argb(3, 3), Some(0xff00_00ff));
    assert_eq!(out.argb(7, 7), Some(0xff00_00ff));
    assert_eq!(out.argb(5, 5), Some(0xffff_ffff));
}

#[test]
fn named_images_draw_and_tile() {
    let out = run(
        r##"{
            "width": 8,
            "height": 8,
            "images": {
                "dot": {"width": 1, "height": 1, "fill": "#00ff00"},
                "stripe": {"width": 2, "height": 1, "pixels": ["#ff0000", "#0000ff"]}
            },
            "commands": [
                {"op": "draw_image", "image": "dot", "x": 6, "y": 6},
                {"op": "set_paint", "paint": {"kind": "texture", "image": "stripe",
                    "anchor": {"x0": 0, "y0": 0, "x1": 2, "y1": 1}}},
                {"op": "fill_rect", "x": 0, "y": 0, "w": 4, "h": 1}
            ]
        }"##,
    )
    .unwrap();
    assert_eq!(out.argb(6, 6), Some(0xff00_ff00));
    assert_eq!(out.argb(0, 0), Some(0xffff_0000));
    assert_eq!(out.argb(1, 0), Some(0xff00_00ff));
    assert_eq!(out.argb(2, 0), Some(0xffff_0000));
    assert_eq!(out.argb(0, 1), Some(0));
}

#[test]
fn svg_path_data_fills_and_clips() {
    let out = run(
        r##"{
            "width": 8,
            "height": 8,
            "background": "#ffffff",
            "commands": [
                {"op": "set_clip", "clip": {"path": "M0 0 L4 0 L4 4 L0 4 Z"}},
                {"op": "set_color", "color": "#000000"},
                {"op": "fill_path", "path": "M0 0 L8 0 L8 8 L0 8 Z"}
            ]
        }"##,
    )
    .unwrap();
    assert_eq!(out.argb(1, 1), Some(0xff00_0000));
    assert_eq!(out.argb(3, 3), Some(0xff00_0000));
    assert_eq!(out.argb(6, 6), Some(0xffff_ffff));
    assert_eq!(out.argb(6, 1), Some(0xffff_ffff));
}

#[test]
fn path_commands_serialize_as_svg_data() {
    let cmd: Command =
        serde_json::from_str(r#"{"op": "draw_path", "path": "M1 1 L5 1 L5 5"}"#).unwrap();
    let json = serde_json::to_value(&cmd).unwrap();
    assert!(json["path"].is_string());
    assert_eq!(serde_json::from_value::<Command>(json).unwrap(), cmd);

    let err = Script::from_json_str(
        r#"{"width": 4, "height": 4, "commands": [{"op": "fill_path", "path": "M0 0 X 1"}]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, GfxError::IllegalArgument(_)));
}

#[test]
fn unknown_image_fails_the_step() {
    let err = run(
        r#"{"width": 4, "height": 4, "commands": [{"op": "draw_image", "image": "nope", "x": 0, "y": 0}]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, GfxError::IllegalArgument(_)));
}

#[test]
fn rejected_state_change_keeps_its_error_kind() {
    let err = run(
        r#"{"width": 4, "height": 4, "commands": [
            {"op": "set_hint", "hint": {"key": "text_lcd_contrast", "value": 5}}
        ]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, GfxError::IllegalArgument(_)));

    let err = run(
        r#"{"width": 4, "height": 4, "commands": [
            {"op": "rotate", "theta": 0.5},
            {"op": "copy_area", "x": 0, "y": 0, "w": 2, "h": 2, "dx": 1, "dy": 1}
        ]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, GfxError::IllegalState(_)));
}

#[test]
fn observer_sees_every_step_in_order() {
    let script = Script::from_json_str(
        r##"{"width": 4, "height": 4, "commands": [
            {"op": "set_color", "color": "#80ff0000"},
            {"op": "fill_rect", "x": 0, "y": 0, "w": 1, "h": 1},
            {"op": "set_paint_mode"}
        ]}"##,
    )
    .unwrap();
    let mut seen = Vec::new();
    script
        .run_with(Arc::new(PipeRegistry::default()), |i, cmd, ctx| {
            seen.push((i, cmd.is_state_change(), ctx.paint_state()));
            Ok(())
        })
        .unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], (0, true, PaintState::AlphaColor));
    assert_eq!(seen[1].0, 1);
    assert!(!seen[1].1);
}

#[test]
fn stroke_spec_builds_dashed_kurbo_stroke() {
    let spec: StrokeSpec =
        serde_json::from_str(r#"{"width": 2.0, "cap": "butt", "dash": [3.0, 1.0]}"#).unwrap();
    let Stroke::Basic(s) = spec.to_stroke() else {
        panic!("expected a basic stroke");
    };
    assert_eq!(s.width, 2.0);
    assert_eq!(s.start_cap, kurbo::Cap::Butt);
    assert_eq!(s.join, kurbo::Join::Miter);
    assert_eq!(s.dash_pattern.as_slice(), &[3.0, 1.0]);
}
