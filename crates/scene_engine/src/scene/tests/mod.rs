//! Scene-level tests driven through the scene manager and the null driver

mod collision_integration;
mod frame_scheduling;
mod node_kinds;

use crate::foundation::logging;
use crate::scene::{FrameStats, SceneManager};
use crate::video::NullDriver;

/// Draw one bracketed frame at `time_ms`
pub(super) fn frame_at(smgr: &mut SceneManager, driver: &mut NullDriver, time_ms: u32) -> FrameStats {
    logging::init();
    smgr.timer_mut().set_time(time_ms);
    smgr.begin_frame(driver).unwrap();
    let stats = smgr.draw_all(driver).unwrap();
    smgr.end_frame(driver).unwrap();
    stats
}
