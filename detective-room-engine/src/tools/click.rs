use bevy::prelude::*;
use constants::interaction::CLICK_DRAG_THRESHOLD_PX;

/// Press/release bookkeeping that tells true clicks from drags.
///
/// Updated once per frame by [`track_pointer`]; consumers read the
/// per-frame `pressed_at` / `clicked_at` fields.
#[derive(Resource, Debug, Default, Clone)]
pub struct ClickTracker {
    press_origin: Option<Vec2>,
    travelled: f32,
    /// Cursor position of a left press this frame.
    pub pressed_at: Option<Vec2>,
    /// Cursor position of a left release this frame, whether click or drag.
    pub released_at: Option<Vec2>,
    /// Set on release when the pointer stayed within the drag threshold.
    pub clicked_at: Option<Vec2>,
}

impl ClickTracker {
    pub fn begin_frame(&mut self) {
        self.pressed_at = None;
        self.released_at = None;
        self.clicked_at = None;
    }

    pub fn press(&mut self, position: Vec2) {
        self.press_origin = Some(position);
        self.travelled = 0.0;
        self.pressed_at = Some(position);
    }

    /// Track the furthest the pointer wandered from the press point.
    pub fn moved(&mut self, position: Vec2) {
        if let Some(origin) = self.press_origin {
            self.travelled = self.travelled.max(origin.distance(position));
        }
    }

    /// Returns true when the release completes a click rather than a drag.
    pub fn release(&mut self, position: Vec2) -> bool {
        let Some(origin) = self.press_origin.take() else {
            return false;
        };
        self.travelled = self.travelled.max(origin.distance(position));
        self.released_at = Some(position);

        let is_click = self.travelled <= CLICK_DRAG_THRESHOLD_PX;
        if is_click {
            self.clicked_at = Some(position);
        }
        is_click
    }

    pub fn is_dragging(&self) -> bool {
        self.press_origin.is_some() && self.travelled > CLICK_DRAG_THRESHOLD_PX
    }
}

/// Whether any UI node (button or panel) currently sits under the pointer.
pub fn pointer_over_ui<'a>(mut interactions: impl Iterator<Item = &'a Interaction>) -> bool {
    interactions.any(|interaction| *interaction != Interaction::None)
}

pub fn track_pointer(
    mut tracker: ResMut<ClickTracker>,
    buttons: Res<ButtonInput<MouseButton>>,
    mut cursor_moved: EventReader<CursorMoved>,
    windows: Query<&Window, With<bevy::window::PrimaryWindow>>,
    ui: Query<&Interaction>,
) {
    tracker.begin_frame();

    for cursor in cursor_moved.read() {
        tracker.moved(cursor.position);
    }

    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };

    // Presses on panels and their buttons never reach the room.
    if buttons.just_pressed(MouseButton::Left) && !pointer_over_ui(ui.iter()) {
        tracker.press(cursor);
    }
    if buttons.just_released(MouseButton::Left) {
        tracker.release(cursor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;
    use bevy::window::PrimaryWindow;

    fn pressed_over(panel: Interaction) -> ClickTracker {
        let mut world = World::new();
        world.init_resource::<ClickTracker>();
        world.init_resource::<Events<CursorMoved>>();
        let mut buttons = ButtonInput::<MouseButton>::default();
        buttons.press(MouseButton::Left);
        world.insert_resource(buttons);

        let mut window = Window::default();
        window.set_cursor_position(Some(Vec2::new(100.0, 100.0)));
        world.spawn((window, PrimaryWindow));
        world.spawn((Node::default(), panel));

        world.run_system_once(track_pointer).expect("system runs");
        world.resource::<ClickTracker>().clone()
    }

    #[test]
    fn presses_on_a_panel_background_stay_out_of_the_room() {
        assert_eq!(pressed_over(Interaction::Hovered).pressed_at, None);
        assert_eq!(
            pressed_over(Interaction::None).pressed_at,
            Some(Vec2::new(100.0, 100.0))
        );
    }

    #[test]
    fn short_press_is_a_click() {
        let mut tracker = ClickTracker::default();
        tracker.press(Vec2::new(100.0, 100.0));
        tracker.moved(Vec2::new(103.0, 102.0));
        assert!(tracker.release(Vec2::new(104.0, 100.0)));
        assert_eq!(tracker.clicked_at, Some(Vec2::new(104.0, 100.0)));
    }

    #[test]
    fn drag_that_returns_home_is_not_a_click() {
        let mut tracker = ClickTracker::default();
        tracker.press(Vec2::ZERO);
        tracker.moved(Vec2::new(40.0, 0.0));
        assert!(tracker.is_dragging());
        assert!(!tracker.release(Vec2::new(1.0, 0.0)));
        assert_eq!(tracker.clicked_at, None);
        assert_eq!(tracker.released_at, Some(Vec2::new(1.0, 0.0)));
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut tracker = ClickTracker::default();
        assert!(!tracker.release(Vec2::ZERO));
        assert_eq!(tracker.released_at, None);
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut tracker = ClickTracker::default();
        tracker.press(Vec2::ZERO);
        assert!(tracker.release(Vec2::new(CLICK_DRAG_THRESHOLD_PX, 0.0)));
    }
}
