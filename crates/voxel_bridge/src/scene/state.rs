//! Scene accumulator
//!
//! `SceneState` is split by lifetime:
//! - [`ResettableScene`] holds everything `clear` wipes: collections, the
//!   transform stack, framing state and the float-mode flag;
//! - [`PersistentSettings`] holds configuration that survives `clear`: room
//!   and record names, catalogs and per-sprite rotation styles and scales.

use super::entities::{
    Angles, Animation, Color, FrameTransform, FramedBox, GameScreen, Light, LightType, Model,
    ModelMove, Sentence, Shape, VoxelBox,
};
use super::error::SceneError;
use super::quantize::{round_two_decimals, NumberMode};
use super::snapshot::Snapshot;
use super::sprites::{RotationStyle, SpriteBook, SpritePlacement, SpriteSettings};
use super::transform_stack::{NodeUpdate, TransformStack};
use crate::assets::PlyLoader;
use crate::core::config::SceneConfig;
use crate::foundation::math::Vec3;

/// Command token that switches coordinates to two-decimal mode
pub const FLOAT_COMMAND: &str = "float";

/// Texture id of an untextured box
pub const NO_TEXTURE: i32 = -1;

/// Everything `clear` resets
#[derive(Debug, Clone)]
pub struct ResettableScene {
    pub(crate) transforms: TransformStack,
    pub(crate) frame_transforms: Vec<FrameTransform>,
    pub(crate) global_animation: Animation,
    pub(crate) animation: Animation,
    pub(crate) boxes: Vec<VoxelBox>,
    pub(crate) frames: Vec<FramedBox>,
    pub(crate) sentences: Vec<Sentence>,
    pub(crate) lights: Vec<Light>,
    pub(crate) commands: Vec<String>,
    pub(crate) models: Vec<Model>,
    pub(crate) model_moves: Vec<ModelMove>,
    pub(crate) sprites: SpriteBook,
    pub(crate) game_score: Option<f64>,
    pub(crate) game_screen: Option<GameScreen>,
    pub(crate) size: f64,
    pub(crate) shape: Shape,
    pub(crate) build_interval: f64,
    pub(crate) is_metallic: bool,
    pub(crate) roughness: f64,
    pub(crate) number_mode: NumberMode,
    pub(crate) framing: bool,
    pub(crate) frame_id: u32,
}

impl Default for ResettableScene {
    fn default() -> Self {
        Self {
            transforms: TransformStack::new(),
            frame_transforms: Vec::new(),
            global_animation: Animation::default(),
            animation: Animation::default(),
            boxes: Vec::new(),
            frames: Vec::new(),
            sentences: Vec::new(),
            lights: Vec::new(),
            commands: Vec::new(),
            models: Vec::new(),
            model_moves: Vec::new(),
            sprites: SpriteBook::default(),
            game_score: None,
            game_screen: None,
            size: 1.0,
            shape: Shape::Box,
            build_interval: 0.01,
            is_metallic: false,
            roughness: 0.5,
            number_mode: NumberMode::Grid,
            framing: false,
            frame_id: 0,
        }
    }
}

/// Everything that outlives `clear`
#[derive(Debug, Clone)]
pub struct PersistentSettings {
    pub(crate) room_name: String,
    pub(crate) record_name: String,
    pub(crate) sprite_settings: SpriteSettings,
    pub(crate) texture_names: Vec<String>,
    pub(crate) model_names: Vec<String>,
    pub(crate) font_size: f64,
}

impl PersistentSettings {
    fn from_config(config: &SceneConfig) -> Self {
        Self {
            room_name: config.room_name.clone(),
            record_name: String::new(),
            sprite_settings: SpriteSettings::default(),
            texture_names: config.texture_names.clone(),
            model_names: config.model_names.clone(),
            font_size: config.font_size,
        }
    }
}

/// The scene accumulator
#[derive(Debug, Clone)]
pub struct SceneState {
    scene: ResettableScene,
    settings: PersistentSettings,
}

impl Default for SceneState {
    fn default() -> Self {
        Self::new(&SceneConfig::default())
    }
}

impl SceneState {
    /// Empty scene using the catalogs from `config`
    pub fn new(config: &SceneConfig) -> Self {
        Self {
            scene: ResettableScene::default(),
            settings: PersistentSettings::from_config(config),
        }
    }

    /// Resettable half, read-only
    pub fn scene(&self) -> &ResettableScene {
        &self.scene
    }

    /// Persistent half, read-only
    pub fn settings(&self) -> &PersistentSettings {
        &self.settings
    }

    /// Reset the scene, keeping persistent settings
    pub fn clear(&mut self) {
        log::debug!(
            "clearing scene ({} boxes, {} frames)",
            self.scene.boxes.len(),
            self.scene.frames.len()
        );
        self.scene = ResettableScene::default();
    }

    // --- scalar settings ---

    /// Room joined when the snapshot is sent
    pub fn set_room_name(&mut self, room: impl Into<String>) {
        self.settings.room_name = room.into();
    }

    /// Current room
    pub fn room_name(&self) -> &str {
        &self.settings.room_name
    }

    /// Free-text name under which the renderer records the build
    pub fn set_record_name(&mut self, name: impl Into<String>) {
        self.settings.record_name = name.into();
    }

    /// Voxel edge length
    pub fn set_box_size(&mut self, size: f64) {
        self.scene.size = round_two_decimals(size);
    }

    /// Delay between boxes while the renderer builds
    pub fn set_build_interval(&mut self, interval: f64) {
        self.scene.build_interval = interval;
    }

    /// Primitive used for every voxel
    pub fn change_shape(&mut self, shape: Shape) {
        self.scene.shape = shape;
    }

    /// Surface material
    pub fn change_material(&mut self, is_metallic: bool, roughness: f64) {
        self.scene.is_metallic = is_metallic;
        self.scene.roughness = round_two_decimals(roughness);
    }

    /// Active quantization mode
    pub fn number_mode(&self) -> NumberMode {
        self.scene.number_mode
    }

    /// Append an opaque command token; `float` also enables float mode
    pub fn set_command(&mut self, token: impl Into<String>) {
        let token = token.into();
        if token == FLOAT_COMMAND {
            self.scene.number_mode = NumberMode::Float;
        }
        self.scene.commands.push(token);
    }

    /// Score shown by the game overlay
    pub fn set_game_score(&mut self, score: f64) {
        self.scene.game_score = Some(score);
    }

    /// Size, tilt and colour of the game overlay
    pub fn set_game_screen(&mut self, width: f64, height: f64, angle: f64, color: Color) {
        self.scene.game_screen = Some(GameScreen {
            width,
            height,
            angle,
            color,
        });
    }

    // --- transforms ---

    /// Current transform stack
    pub fn transforms(&self) -> &TransformStack {
        &self.scene.transforms
    }

    /// Save the current matrix transform
    pub fn push_matrix(&mut self) {
        self.scene.transforms.push();
    }

    /// Restore the previous matrix transform
    pub fn pop_matrix(&mut self) -> Result<(), SceneError> {
        self.scene.transforms.pop()
    }

    /// Place the node, or the current matrix when one is pushed
    pub fn set_node(&mut self, position: Vec3, angles: Angles) {
        let mode = self.scene.number_mode;
        let update = self.scene.transforms.set_node(&position, angles, mode);
        if let NodeUpdate::Unparented(frame) = update {
            if self.scene.framing {
                self.scene.frame_transforms.push(FrameTransform {
                    position: frame.position,
                    angles,
                    frame_id: self.scene.frame_id,
                });
            } else {
                self.scene.transforms.set_node_transform(frame);
            }
        }
    }

    /// Animate the node
    pub fn animate_node(&mut self, position: Vec3, angles: Angles, scale: f64, interval: f64) {
        self.scene.animation = self.animation(position, angles, scale, interval);
    }

    /// Animate the whole scene
    pub fn animate_global(&mut self, position: Vec3, angles: Angles, scale: f64, interval: f64) {
        self.scene.global_animation = self.animation(position, angles, scale, interval);
    }

    fn animation(&self, position: Vec3, angles: Angles, scale: f64, interval: f64) -> Animation {
        Animation {
            position: self.scene.number_mode.quantize_vec(&position),
            angles,
            scale: round_two_decimals(scale),
            interval,
        }
    }

    // --- frames ---

    /// Start recording a frame
    pub fn frame_in(&mut self) {
        self.scene.framing = true;
    }

    /// Stop recording and advance the frame id
    pub fn frame_out(&mut self) {
        self.scene.framing = false;
        self.scene.frame_id += 1;
    }

    /// Whether a frame is being recorded
    pub fn is_framing(&self) -> bool {
        self.scene.framing
    }

    /// Id the next framed entity receives
    pub fn frame_id(&self) -> u32 {
        self.scene.frame_id
    }

    /// Playback speed of recorded frames
    pub fn set_frame_fps(&mut self, fps: u32) {
        self.scene.commands.push(format!("fps {fps}"));
    }

    /// How often recorded frames loop
    pub fn set_frame_repeats(&mut self, repeats: u32) {
        self.scene.commands.push(format!("repeats {repeats}"));
    }

    // --- boxes ---

    /// Steady-state boxes
    pub fn boxes(&self) -> &[VoxelBox] {
        &self.scene.boxes
    }

    /// Boxes recorded in frames
    pub fn frames(&self) -> &[FramedBox] {
        &self.scene.frames
    }

    /// Place a coloured box, replacing whatever occupies the cell
    pub fn create_box(&mut self, position: Vec3, color: Color) {
        self.insert_box(position, color, NO_TEXTURE);
    }

    /// Place a textured box
    pub fn create_textured_box(&mut self, position: Vec3, texture: &str) -> Result<(), SceneError> {
        let texture_id = self
            .settings
            .texture_names
            .iter()
            .position(|name| name == texture)
            .ok_or_else(|| SceneError::UnknownTexture(texture.to_string()))?;
        self.insert_box(position, Color::white(), texture_id as i32);
        Ok(())
    }

    fn insert_box(&mut self, local: Vec3, color: Color, texture_id: i32) {
        let world = self.scene.transforms.resolve(&local);
        let position = self.scene.number_mode.quantize_vec(&world);
        self.remove_cell(&position);

        let voxel = VoxelBox {
            position,
            color,
            texture_id,
        };
        if self.scene.framing {
            self.scene.frames.push(FramedBox {
                voxel,
                frame_id: self.scene.frame_id,
            });
        } else {
            self.scene.boxes.push(voxel);
        }
    }

    /// Remove the box at a cell, scoped to the current frame while framing
    pub fn remove_box(&mut self, position: Vec3) {
        let position = self.scene.number_mode.quantize_vec(&position);
        self.remove_cell(&position);
    }

    fn remove_cell(&mut self, position: &Vec3) {
        if self.scene.framing {
            let frame_id = self.scene.frame_id;
            self.scene
                .frames
                .retain(|f| !(f.frame_id == frame_id && f.voxel.occupies(position)));
        } else {
            self.scene.boxes.retain(|b| !b.occupies(position));
        }
    }

    /// Rasterise a line of boxes; returns how many were placed.
    ///
    /// Steps one unit along the axis with the largest delta, inclusive of
    /// both ends, interpolating the other two axes. In float mode a fractional
    /// remainder ends the line with one shorter step onto `to`.
    pub fn draw_line(&mut self, from: Vec3, to: Vec3, color: Color) -> usize {
        let mode = self.scene.number_mode;
        let start = mode.quantize_vec(&from);
        let end = mode.quantize_vec(&to);
        let delta = end - start;
        if delta.iter().all(|d| *d == 0.0) {
            return 0;
        }

        let axis = delta.iamax();
        let length = delta[axis].abs();
        let direction = delta[axis].signum();
        let steps = length.floor() as u64;

        for i in 0..=steps {
            let travelled = i as f64;
            let t = travelled / length;
            let mut point = start + delta * t;
            point[axis] = start[axis] + direction * travelled;
            self.create_box(point, color);
        }
        if (steps as f64) < length {
            self.create_box(end, color);
            return steps as usize + 2;
        }
        steps as usize + 1
    }

    // --- text and lights ---

    /// Write text in the scene; `font_size` falls back to the configured size
    pub fn write_sentence(
        &mut self,
        text: impl Into<String>,
        position: Vec3,
        color: Color,
        font_size: Option<f64>,
        fixed_width: bool,
    ) {
        let position = self.scene.number_mode.quantize_vec(&position);
        self.scene.sentences.push(Sentence {
            text: text.into(),
            position,
            color,
            font_size: font_size.unwrap_or(self.settings.font_size),
            fixed_width,
        });
    }

    /// Add a light
    pub fn set_light(
        &mut self,
        position: Vec3,
        color: Color,
        intensity: f64,
        interval: f64,
        light_type: LightType,
    ) {
        let position = self.scene.number_mode.quantize_vec(&position);
        self.scene.lights.push(Light {
            position,
            color,
            intensity: round_two_decimals(intensity),
            interval: round_two_decimals(interval),
            light_type,
        });
    }

    // --- models ---

    /// Place a catalog model as a named entity
    pub fn create_model(
        &mut self,
        model_name: &str,
        position: Vec3,
        angles: Angles,
        scale: f64,
        entity_name: impl Into<String>,
    ) -> Result<(), SceneError> {
        if !self.settings.model_names.iter().any(|m| m == model_name) {
            return Err(SceneError::UnknownModel(model_name.to_string()));
        }
        let position = self.scene.number_mode.quantize_vec(&position);
        self.scene.models.push(Model {
            model_name: model_name.to_string(),
            position,
            angles,
            scale: round_two_decimals(scale),
            entity_name: entity_name.into(),
        });
        Ok(())
    }

    /// Move a model entity created earlier in this scene
    pub fn move_model(
        &mut self,
        entity_name: &str,
        position: Vec3,
        angles: Angles,
        scale: f64,
    ) -> Result<(), SceneError> {
        if !self.scene.models.iter().any(|m| m.entity_name == entity_name) {
            return Err(SceneError::UnknownEntity(entity_name.to_string()));
        }
        let position = self.scene.number_mode.quantize_vec(&position);
        self.scene.model_moves.push(ModelMove {
            entity_name: entity_name.to_string(),
            position,
            angles,
            scale: round_two_decimals(scale),
        });
        Ok(())
    }

    // --- sprites ---

    /// Define a sprite appearance
    pub fn create_sprite_template(
        &mut self,
        name: impl Into<String>,
        color_source: impl Into<String>,
    ) {
        self.scene.sprites.add_template(name, color_source);
    }

    /// Choose how `name` turns its direction into rotation
    pub fn set_sprite_rotation_style(&mut self, name: impl Into<String>, style: RotationStyle) {
        self.settings.sprite_settings.set_rotation_style(name, style);
    }

    /// Default scale of `name`
    pub fn set_sprite_scale(&mut self, name: impl Into<String>, scale: f64) {
        self.settings.sprite_settings.set_scale(name, round_two_decimals(scale));
    }

    /// Show the template `name` at a position
    pub fn display_sprite(
        &mut self,
        name: &str,
        x: f64,
        y: f64,
        direction: f64,
        scale: Option<f64>,
    ) -> Result<(), SceneError> {
        let placement = self.sprite_placement(name, x, y, direction, scale);
        self.scene.sprites.place(name, placement)
    }

    /// Show clone `clone_index` of `name` at a position
    pub fn display_sprite_clone(
        &mut self,
        name: &str,
        clone_index: u32,
        x: f64,
        y: f64,
        direction: f64,
        scale: Option<f64>,
    ) -> Result<(), SceneError> {
        let placement = self.sprite_placement(name, x, y, direction, scale);
        self.scene.sprites.place_clone(name, clone_index, placement)
    }

    fn sprite_placement(
        &self,
        name: &str,
        x: f64,
        y: f64,
        direction: f64,
        scale: Option<f64>,
    ) -> SpritePlacement {
        let sprites = &self.settings.sprite_settings;
        let mode = self.scene.number_mode;
        SpritePlacement {
            x: mode.quantize(x),
            y: mode.quantize(y),
            direction: sprites.rotation_style(name).remap(direction),
            scale: round_two_decimals(scale.unwrap_or_else(|| sprites.scale(name))),
        }
    }

    // --- mesh import ---

    /// Import a voxel mesh; returns how many boxes were placed.
    ///
    /// Nothing is placed when the mesh is malformed.
    pub fn import_mesh(&mut self, text: &str) -> Result<usize, SceneError> {
        let import = PlyLoader::load_boxes(text)?;
        for imported in &import.boxes {
            self.create_box(imported.position, imported.color);
        }
        log::debug!("imported {} boxes from mesh", import.boxes.len());
        Ok(import.boxes.len())
    }

    // --- output ---

    /// Build the wire snapshot stamped with `date`
    pub fn snapshot(&self, date: String) -> Snapshot {
        let scene = &self.scene;
        Snapshot {
            node_transform: *scene.transforms.node(),
            matrix_transform: *scene.transforms.matrix(),
            frame_transforms: scene.frame_transforms.clone(),
            global_animation: scene.global_animation,
            animation: scene.animation,
            boxes: scene.boxes.clone(),
            frames: scene.frames.clone(),
            sentences: scene.sentences.clone(),
            lights: scene.lights.clone(),
            commands: scene.commands.clone(),
            models: scene.models.clone(),
            model_moves: scene.model_moves.clone(),
            sprites: scene.sprites.templates().to_vec(),
            sprite_moves: scene.sprites.merged_moves(),
            game_score: scene.game_score.into_iter().collect(),
            game_screen: scene.game_screen,
            size: scene.size,
            shape: scene.shape,
            interval: scene.build_interval,
            is_metallic: u8::from(scene.is_metallic),
            roughness: scene.roughness,
            is_allowed_float: u8::from(scene.number_mode.is_float()),
            name: self.settings.record_name.clone(),
            date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::transform_stack::{Rotation, TransformFrame};

    fn red() -> Color {
        Color::new(1.0, 0.0, 0.0, 1.0)
    }

    fn blue() -> Color {
        Color::new(0.0, 0.0, 1.0, 1.0)
    }

    fn v(x: f64, y: f64, z: f64) -> Vec3 {
        Vec3::new(x, y, z)
    }

    #[test]
    fn test_box_dedup_keeps_latest_colour() {
        let mut state = SceneState::default();
        state.create_box(v(2.0, 3.0, 4.0), red());
        state.create_box(v(2.0, 3.0, 4.0), blue());

        assert_eq!(state.boxes().len(), 1);
        assert_eq!(state.boxes()[0].position, v(2.0, 3.0, 4.0));
        assert_eq!(state.boxes()[0].color, blue());
    }

    #[test]
    fn test_dedup_uses_quantized_cell() {
        let mut state = SceneState::default();
        state.create_box(v(2.2, 3.9, 4.0), red());
        state.create_box(v(2.7, 3.1, 4.5), blue());
        assert_eq!(state.boxes().len(), 1);
    }

    #[test]
    fn test_push_pop_is_reversible() {
        let mut direct = SceneState::default();
        direct.set_node(v(5.0, 0.0, 0.0), Angles::default());

        let mut nested = SceneState::default();
        nested.push_matrix();
        nested.set_node(v(1.0, 0.0, 0.0), Angles::default());
        nested.pop_matrix().unwrap();
        nested.set_node(v(5.0, 0.0, 0.0), Angles::default());

        assert_eq!(nested.transforms().node(), direct.transforms().node());
        assert_eq!(nested.transforms().matrix(), direct.transforms().matrix());
        assert_eq!(nested.transforms().depth(), 0);
    }

    #[test]
    fn test_pop_without_push_is_an_error() {
        let mut state = SceneState::default();
        assert!(matches!(state.pop_matrix(), Err(SceneError::StackUnderflow)));
        // The scene keeps working afterwards
        state.create_box(v(0.0, 0.0, 0.0), red());
        assert_eq!(state.boxes().len(), 1);
    }

    #[test]
    fn test_boxes_follow_pushed_matrix() {
        let mut state = SceneState::default();
        state.push_matrix();
        state.set_node(v(10.0, 0.0, 0.0), Angles::new(0.0, 90.0, 0.0));
        state.create_box(v(1.0, 0.0, 0.0), red());
        state.pop_matrix().unwrap();
        state.create_box(v(1.0, 0.0, 0.0), red());

        let positions: Vec<Vec3> = state.boxes().iter().map(|b| b.position).collect();
        assert_eq!(positions, vec![v(10.0, 0.0, -1.0), v(1.0, 0.0, 0.0)]);
        // The node transform was never touched
        assert_eq!(*state.transforms().node(), TransformFrame::identity());
    }

    #[test]
    fn test_frame_isolation() {
        let mut state = SceneState::default();
        state.frame_in();
        state.create_box(v(1.0, 1.0, 1.0), red());
        state.frame_out();
        state.frame_in();
        state.create_box(v(1.0, 1.0, 1.0), blue());
        state.frame_out();

        assert_eq!(state.frames().len(), 2);
        assert_eq!(state.frames()[0].frame_id, 0);
        assert_eq!(state.frames()[1].frame_id, 1);
        assert!(state.boxes().is_empty());
    }

    #[test]
    fn test_dedup_within_a_frame() {
        let mut state = SceneState::default();
        state.create_box(v(0.0, 0.0, 0.0), red());
        state.frame_in();
        state.create_box(v(0.0, 0.0, 0.0), red());
        state.create_box(v(0.0, 0.0, 0.0), blue());

        assert_eq!(state.frames().len(), 1);
        assert_eq!(state.frames()[0].voxel.color, blue());
        // The steady box is outside the frame scope
        assert_eq!(state.boxes().len(), 1);

        state.remove_box(v(0.0, 0.0, 0.0));
        assert!(state.frames().is_empty());
        assert_eq!(state.boxes().len(), 1);
    }

    #[test]
    fn test_framed_node_transforms_are_recorded() {
        let mut state = SceneState::default();
        state.frame_in();
        state.set_node(v(1.0, 2.0, 3.0), Angles::new(0.0, 0.0, 45.0));
        state.frame_out();
        state.frame_in();
        state.set_node(v(4.0, 5.0, 6.0), Angles::default());

        let transforms = &state.scene().frame_transforms;
        assert_eq!(transforms.len(), 2);
        assert_eq!(transforms[0].frame_id, 0);
        assert_eq!(transforms[1].position, v(4.0, 5.0, 6.0));
        assert_eq!(transforms[1].frame_id, 1);
        assert_eq!(*state.transforms().node(), TransformFrame::identity());
    }

    #[test]
    fn test_quantization_modes() {
        let mut state = SceneState::default();
        state.set_node(v(1.96, 0.0, 0.0), Angles::default());
        assert_eq!(state.transforms().node().position.x, 1.0);

        state.set_command("float");
        state.set_node(v(1.96, 0.0, 0.0), Angles::default());
        assert_eq!(state.transforms().node().position.x, 1.96);
        assert_eq!(state.scene().commands, vec!["float".to_string()]);

        state.clear();
        assert_eq!(state.number_mode(), NumberMode::Grid);
    }

    #[test]
    fn test_line_raster_along_x() {
        let mut state = SceneState::default();
        let placed = state.draw_line(v(0.0, 0.0, 0.0), v(3.0, 0.0, 0.0), red());
        assert_eq!(placed, 4);
        let positions: Vec<Vec3> = state.boxes().iter().map(|b| b.position).collect();
        assert_eq!(
            positions,
            vec![v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(2.0, 0.0, 0.0), v(3.0, 0.0, 0.0)]
        );
    }

    #[test]
    fn test_line_raster_backwards_and_diagonal() {
        let mut state = SceneState::default();
        let placed = state.draw_line(v(0.0, 4.0, 0.0), v(2.0, 0.0, 0.0), red());
        assert_eq!(placed, 5);
        let positions: Vec<Vec3> = state.boxes().iter().map(|b| b.position).collect();
        assert_eq!(
            positions,
            vec![
                v(0.0, 4.0, 0.0),
                v(0.0, 3.0, 0.0),
                v(1.0, 2.0, 0.0),
                v(1.0, 1.0, 0.0),
                v(2.0, 0.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_float_line_ends_on_far_endpoint() {
        let mut state = SceneState::default();
        state.set_command("float");
        let placed = state.draw_line(v(0.5, 0.0, 0.0), v(3.7, 0.0, 0.0), red());
        assert_eq!(placed, 5);
        let xs: Vec<f64> = state.boxes().iter().map(|b| b.position.x).collect();
        assert_eq!(xs, vec![0.5, 1.5, 2.5, 3.5, 3.7]);
    }

    #[test]
    fn test_degenerate_line_is_noop() {
        let mut state = SceneState::default();
        assert_eq!(state.draw_line(v(1.0, 1.0, 1.0), v(1.2, 1.5, 1.9), red()), 0);
        assert!(state.boxes().is_empty());
    }

    #[test]
    fn test_textured_box_catalog() {
        let mut state = SceneState::default();
        state.create_textured_box(v(0.0, 0.0, 0.0), "stone").unwrap();
        assert_eq!(state.boxes()[0].texture_id, 1);

        let err = state.create_textured_box(v(1.0, 0.0, 0.0), "lava").unwrap_err();
        assert!(matches!(err, SceneError::UnknownTexture(_)));
        assert_eq!(state.boxes().len(), 1);
    }

    #[test]
    fn test_models_require_catalog_and_entity() {
        let mut state = SceneState::default();
        assert!(matches!(
            state.create_model("Dragon", v(0.0, 0.0, 0.0), Angles::default(), 1.0, "d1"),
            Err(SceneError::UnknownModel(_))
        ));
        assert!(matches!(
            state.move_model("ship1", v(0.0, 0.0, 0.0), Angles::default(), 1.0),
            Err(SceneError::UnknownEntity(_))
        ));

        state.create_model("Ship", v(0.0, 0.0, 0.0), Angles::default(), 1.0, "ship1").unwrap();
        state.move_model("ship1", v(0.0, 5.5, 0.0), Angles::new(0.0, 30.0, 0.0), 2.0).unwrap();
        assert_eq!(state.scene().model_moves[0].position, v(0.0, 5.0, 0.0));
    }

    #[test]
    fn test_sprite_direction_uses_rotation_style() {
        let mut state = SceneState::default();
        state.create_sprite_template("cat", "0,0,0");
        state.display_sprite("cat", 10.0, 20.0, 90.0, None).unwrap();
        let snapshot = state.snapshot(String::new());
        assert_eq!(snapshot.sprite_moves[0].placement.direction, 0.0);

        state.set_sprite_rotation_style("cat", RotationStyle::LeftRight);
        state.set_sprite_scale("cat", 2.0);
        state.display_sprite("cat", 10.0, 20.0, -90.0, None).unwrap();
        let snapshot = state.snapshot(String::new());
        assert_eq!(snapshot.sprite_moves[0].placement.direction, -180.0);
        assert_eq!(snapshot.sprite_moves[0].placement.scale, 2.0);

        assert!(matches!(
            state.display_sprite("dog", 0.0, 0.0, 90.0, None),
            Err(SceneError::UnknownSprite(_))
        ));
    }

    #[test]
    fn test_clear_keeps_persistent_settings() {
        let mut state = SceneState::default();
        state.set_room_name("2048");
        state.set_record_name("castle");
        state.set_sprite_rotation_style("cat", RotationStyle::DontRotate);
        state.set_sprite_scale("cat", 3.0);
        state.create_sprite_template("cat", "red");
        state.push_matrix();
        state.frame_in();
        state.frame_out();
        state.create_box(v(0.0, 0.0, 0.0), red());
        state.set_light(v(1.0, 1.0, 1.0), red(), 1000.0, 1.0, LightType::Spot);
        state.set_game_score(10.0);

        state.clear();

        assert!(state.boxes().is_empty());
        assert!(state.scene().lights.is_empty());
        assert!(state.scene().sprites.templates().is_empty());
        assert_eq!(state.transforms().depth(), 0);
        assert_eq!(state.frame_id(), 0);
        assert_eq!(state.scene().game_score, None);

        assert_eq!(state.room_name(), "2048");
        assert_eq!(state.settings().record_name, "castle");
        let sprites = &state.settings().sprite_settings;
        assert_eq!(sprites.rotation_style("cat"), RotationStyle::DontRotate);
        assert_eq!(state.settings().sprite_settings.scale("cat"), 3.0);
    }

    #[test]
    fn test_import_mesh_goes_through_create_box() {
        let mut state = SceneState::default();
        state.push_matrix();
        state.set_node(v(10.0, 0.0, 0.0), Angles::default());
        // Single -X face of the voxel at the origin
        let face = "0 0 0 1 0 0\n0 0 1 1 0 0\n0 1 1 1 0 0\n0 1 0 1 0 0";
        assert_eq!(state.import_mesh(face).unwrap(), 1);
        assert_eq!(state.boxes()[0].position, v(10.0, 0.0, 0.0));
        assert_eq!(state.boxes()[0].color, red());

        let err = state.import_mesh("0 0 0 1 0 0").unwrap_err();
        assert!(matches!(err, SceneError::Mesh(_)));
        assert_eq!(state.boxes().len(), 1);
    }

    #[test]
    fn test_matrix_transform_is_composed_inside_push() {
        let mut state = SceneState::default();
        state.push_matrix();
        state.set_node(v(0.0, 0.0, 0.0), Angles::new(90.0, 0.0, 0.0));
        assert!(matches!(state.transforms().matrix().rotation, Rotation::Matrix(_)));
    }
}
