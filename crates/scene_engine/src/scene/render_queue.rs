//! Per-frame render queue
//!
//! Collects the nodes that registered during a frame's registration pass and
//! organizes them by [`RenderPass`] for drawing.
//!
//! The queue is cleared, not reallocated, at the start of every frame. Each
//! pass keeps its own buffer so the draw phase can walk them in
//! [`RenderPass::DRAW_ORDER`] without filtering.

use super::node::NodeId;

/// Pass a node can register for
///
/// Passes are drawn in [`RenderPass::DRAW_ORDER`]; `Automatic` is only valid
/// at registration time and resolves to `Solid` or `Transparent` from the
/// node's materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderPass {
    /// Active camera: binds view and projection
    Camera,
    /// Dynamic lights
    Light,
    /// Sky boxes and other background geometry
    SkyBox,
    /// Resolved at registration from material transparency
    Automatic,
    /// Opaque geometry
    Solid,
    /// Stencil shadow volumes
    Shadow,
    /// Blended geometry, back to front
    Transparent,
    /// Particles and similar effects, back to front
    TransparentEffect,
}

impl RenderPass {
    /// Order in which passes are drawn
    pub const DRAW_ORDER: [Self; 7] = [
        Self::Camera,
        Self::Light,
        Self::SkyBox,
        Self::Solid,
        Self::Shadow,
        Self::Transparent,
        Self::TransparentEffect,
    ];

    /// Whether registration for this pass is subject to automatic culling
    pub fn is_culled(self) -> bool {
        matches!(
            self,
            Self::Solid | Self::Shadow | Self::Transparent | Self::TransparentEffect
        )
    }

    /// Whether entries in this pass are sorted back to front
    pub fn is_back_to_front(self) -> bool {
        matches!(self, Self::Transparent | Self::TransparentEffect)
    }

    /// Slot of a drawable pass in the queue, `None` for `Automatic`
    pub(crate) fn slot(self) -> Option<usize> {
        Self::DRAW_ORDER.iter().position(|p| *p == self)
    }
}

/// One queued node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderEntry {
    /// Node to render
    pub node: NodeId,
    /// Pass the node was queued under
    pub pass: RenderPass,
    /// Squared distance from the active camera, 0 without a camera
    pub distance_sq: f32,
    /// Material key used to group opaque draws
    pub material_key: u64,
}

/// Render queue for one frame
#[derive(Debug)]
pub struct RenderQueue {
    /// One buffer per drawable pass, in draw order
    passes: [Vec<RenderEntry>; 7],
}

impl RenderQueue {
    /// Create an empty render queue
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty render queue reserving `capacity` entries per pass
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            passes: std::array::from_fn(|_| Vec::with_capacity(capacity)),
        }
    }

    /// Remove all entries, keeping allocations
    pub fn clear(&mut self) {
        for pass in &mut self.passes {
            pass.clear();
        }
    }

    /// Queue a node
    ///
    /// Returns `false` for `Automatic`, which must be resolved by the caller.
    pub fn push(&mut self, entry: RenderEntry) -> bool {
        match entry.pass.slot() {
            Some(slot) => {
                self.passes[slot].push(entry);
                true
            }
            None => false,
        }
    }

    /// Sort every pass for drawing
    ///
    /// Opaque passes are grouped by material key; blended passes are ordered
    /// by descending camera distance. Both sorts are stable so ties keep
    /// registration order.
    pub fn sort(&mut self) {
        for pass in RenderPass::DRAW_ORDER {
            let Some(slot) = pass.slot() else { continue };
            let entries = &mut self.passes[slot];
            if pass.is_back_to_front() {
                entries.sort_by(|a, b| b.distance_sq.total_cmp(&a.distance_sq));
            } else if pass == RenderPass::Solid {
                entries.sort_by_key(|e| e.material_key);
            }
        }
    }

    /// Entries queued under a pass
    pub fn entries(&self, pass: RenderPass) -> &[RenderEntry] {
        pass.slot().map_or(&[], |slot| &self.passes[slot])
    }

    /// Mutable access to the entries of a pass
    pub fn entries_mut(&mut self, pass: RenderPass) -> Option<&mut Vec<RenderEntry>> {
        pass.slot().map(move |slot| &mut self.passes[slot])
    }

    /// Whether a node is queued under a pass
    pub fn contains(&self, pass: RenderPass, node: NodeId) -> bool {
        self.entries(pass).iter().any(|e| e.node == node)
    }

    /// Whether a node is queued under any pass
    pub fn contains_node(&self, node: NodeId) -> bool {
        RenderPass::DRAW_ORDER.iter().any(|p| self.contains(*p, node))
    }

    /// Iterate all entries in draw order
    pub fn iter(&self) -> impl Iterator<Item = &RenderEntry> {
        self.passes.iter().flatten()
    }

    /// Get total number of queued entries
    pub fn len(&self) -> usize {
        self.passes.iter().map(Vec::len).sum()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.passes.iter().all(Vec::is_empty)
    }
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new()
    }
}
