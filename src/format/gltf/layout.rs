//! Decides how the vertex and index data of one mesh are placed into buffer
//! views.
//!
//! Attributes whose byte ranges overlap in the source (an interleaved struct,
//! or several accessors aliasing the same memory) share one buffer view with an
//! explicit stride. Every other attribute gets a buffer view of its own, even
//! when it directly follows another one in memory.

use super::buffer::{lcm, padding};

/// Where a single accessor's elements live in the source vertex blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeSpan {
    pub offset: usize,
    pub stride: usize,
    /// The size of one element.
    pub size: usize,
    pub component_size: usize,
    pub count: usize,
}

impl AttributeSpan {
    /// The end of the range reserved by the attribute, including padding after
    /// the last element.
    pub fn range_end(&self) -> usize {
        self.offset + self.stride * self.count
    }

    /// The larger of both ends, or `None` when computing either overflows.
    pub fn checked_end(&self) -> Option<usize> {
        let range = self.stride.checked_mul(self.count)?.checked_add(self.offset)?;
        let footprint = match self.count {
            0 => self.offset,
            count => self
                .stride
                .checked_mul(count - 1)?
                .checked_add(self.size)?
                .checked_add(self.offset)?,
        };
        Some(range.max(footprint))
    }

    /// The end of the bytes the attribute actually reads.
    pub fn footprint_end(&self) -> usize {
        if self.count == 0 {
            self.offset
        } else {
            self.offset + self.stride * (self.count - 1) + self.size
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexSpan {
    pub size: usize,
    pub count: usize,
}

/// A position in the destination buffer and the zero bytes inserted before it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Placement {
    pub offset: usize,
    pub padding: usize,
}

/// A set of attributes sharing one buffer view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeGroup {
    /// Indices into the planned spans, in source offset order.
    pub members: Vec<usize>,
    /// The source offset the group starts at.
    pub start: usize,
    /// The number of bytes copied from the source, starting at `start`.
    pub length: usize,
    pub stride: usize,
    /// Whether the view has to state its stride explicitly.
    pub byte_stride: Option<usize>,
    pub placement: Placement,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Layout {
    pub index: Option<Placement>,
    pub groups: Vec<AttributeGroup>,
    /// Zero bytes appended after the last group to keep the buffer four-byte
    /// aligned.
    pub trailing_padding: usize,
    /// The buffer length after the mesh is written.
    pub end: usize,
}

impl Layout {
    pub fn total_padding(&self) -> usize {
        self.index.map(|index| index.padding).unwrap_or_default()
            + self
                .groups
                .iter()
                .map(|group| group.placement.padding)
                .sum::<usize>()
            + self.trailing_padding
    }
}

/// Partitions the spans into groups and places the index data and the groups
/// after `base`, the current length of the destination buffer.
pub fn plan(base: usize, indices: Option<IndexSpan>, spans: &[AttributeSpan]) -> Layout {
    let mut cursor = base;
    let mut layout = Layout::default();

    if let Some(indices) = indices {
        // Byte indices don't need any alignment, wider ones stay four-byte
        // aligned like everything else.
        let alignment = if indices.size > 1 {
            lcm(4, indices.size)
        } else {
            1
        };
        let placement = Placement {
            offset: cursor + padding(cursor, alignment),
            padding: padding(cursor, alignment),
        };
        cursor = placement.offset + indices.size * indices.count;
        layout.index = Some(placement);
    }

    for mut group in group(spans) {
        let alignment = group
            .members
            .iter()
            .map(|&member| lcm(4, spans[member].component_size.max(1)))
            .max()
            .unwrap_or(4);
        group.placement = Placement {
            offset: cursor + padding(cursor, alignment),
            padding: padding(cursor, alignment),
        };
        cursor = group.placement.offset + group.length;
        layout.groups.push(group);
    }

    layout.trailing_padding = padding(cursor, 4);
    layout.end = cursor + layout.trailing_padding;
    layout
}

fn group(spans: &[AttributeSpan]) -> Vec<AttributeGroup> {
    // Stable sort, so attributes aliasing the same offset keep declaration order.
    let mut order: Vec<usize> = (0..spans.len()).collect();
    order.sort_by_key(|&index| spans[index].offset);

    let mut groups: Vec<AttributeGroup> = Vec::new();
    let mut ends: Vec<usize> = Vec::new();
    for index in order {
        let span = &spans[index];
        let existing = groups
            .iter()
            .zip(&ends)
            .position(|(group, &end)| group.stride == span.stride && span.offset < end);
        match existing {
            Some(existing) => {
                groups[existing].members.push(index);
                ends[existing] = ends[existing].max(span.range_end());
            }
            None => {
                groups.push(AttributeGroup {
                    members: vec![index],
                    start: span.offset,
                    length: 0,
                    stride: span.stride,
                    byte_stride: None,
                    placement: Placement::default(),
                });
                ends.push(span.range_end());
            }
        }
    }

    for group in &mut groups {
        let footprint = group
            .members
            .iter()
            .map(|&member| spans[member].footprint_end())
            .max()
            .unwrap_or(group.start);
        let count = group
            .members
            .iter()
            .map(|&member| spans[member].count)
            .max()
            .unwrap_or_default();
        group.length = (footprint - group.start).max(group.stride * count);
        let first = &spans[group.members[0]];
        if group.members.len() > 1 || group.stride != first.size {
            group.byte_stride = Some(group.stride);
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn span(offset: usize, stride: usize, size: usize, count: usize) -> AttributeSpan {
        AttributeSpan {
            offset,
            stride,
            size,
            component_size: 4,
            count,
        }
    }

    #[test]
    fn separate_attributes() {
        let spans = [span(0, 12, 12, 4), span(64, 4, 4, 4)];
        let layout = plan(0, None, &spans);

        assert_eq!(2, layout.groups.len());
        assert_eq!(vec![0], layout.groups[0].members);
        assert_eq!(48, layout.groups[0].length);
        assert_eq!(None, layout.groups[0].byte_stride);
        assert_eq!(vec![1], layout.groups[1].members);
        assert_eq!(Placement { offset: 48, padding: 0 }, layout.groups[1].placement);
        assert_eq!(64, layout.end);
    }

    #[test]
    fn span_ends() {
        assert_eq!(Some(48), span(0, 12, 12, 4).checked_end());
        assert_eq!(Some(20), span(4, 4, 8, 3).checked_end());
        assert_eq!(Some(7), span(7, 12, 12, 0).checked_end());
        assert_eq!(None, span(0, usize::MAX, 12, 2).checked_end());
        assert_eq!(None, span(usize::MAX - 4, 12, 12, 1).checked_end());
    }

    #[test]
    fn adjacent_attributes_stay_separate() {
        let spans = [span(0, 12, 12, 3), span(36, 12, 12, 3)];
        let layout = plan(0, None, &spans);

        assert_eq!(2, layout.groups.len());
        assert_eq!(36, layout.groups[1].placement.offset);
    }

    #[test]
    fn interleaved_attributes() {
        let spans = [span(12, 24, 12, 3), span(0, 24, 12, 3)];
        let layout = plan(0, None, &spans);

        assert_eq!(1, layout.groups.len());
        let group = &layout.groups[0];
        assert_eq!(vec![1, 0], group.members);
        assert_eq!(0, group.start);
        assert_eq!(72, group.length);
        assert_eq!(Some(24), group.byte_stride);
    }

    #[test]
    fn aliased_attributes_keep_declaration_order() {
        let spans = [span(0, 16, 16, 2), span(0, 16, 8, 2), span(8, 16, 8, 2)];
        let layout = plan(0, None, &spans);

        assert_eq!(1, layout.groups.len());
        assert_eq!(vec![0, 1, 2], layout.groups[0].members);
        assert_eq!(32, layout.groups[0].length);
    }

    #[test]
    fn overlapping_attributes_with_different_strides() {
        let spans = [span(0, 12, 12, 4), span(16, 4, 4, 4)];
        let layout = plan(0, None, &spans);

        assert_eq!(2, layout.groups.len());
    }

    #[test]
    fn trailing_stride_padding_is_copied() {
        // A single attribute with padding after each element states its stride
        // and reserves the padding after the last element as well.
        let spans = [span(0, 16, 12, 3)];
        let layout = plan(0, None, &spans);

        assert_eq!(48, layout.groups[0].length);
        assert_eq!(Some(16), layout.groups[0].byte_stride);
    }

    #[test]
    fn index_alignment() {
        let spans = [span(0, 12, 12, 2)];

        let bytes = plan(3, Some(IndexSpan { size: 1, count: 3 }), &spans);
        assert_eq!(Some(Placement { offset: 3, padding: 0 }), bytes.index);
        assert_eq!(Placement { offset: 8, padding: 2 }, bytes.groups[0].placement);

        let shorts = plan(3, Some(IndexSpan { size: 2, count: 3 }), &spans);
        assert_eq!(Some(Placement { offset: 4, padding: 1 }), shorts.index);
        assert_eq!(Placement { offset: 12, padding: 2 }, shorts.groups[0].placement);
    }

    #[test]
    fn total_length() {
        let spans = [
            AttributeSpan {
                offset: 0,
                stride: 3,
                size: 3,
                component_size: 1,
                count: 3,
            },
            span(9, 4, 4, 3),
        ];
        let layout = plan(2, Some(IndexSpan { size: 1, count: 1 }), &spans);

        let sizes: usize = 1 + layout.groups.iter().map(|group| group.length).sum::<usize>();
        assert_eq!(2 + sizes + layout.total_padding(), layout.end);
        assert_eq!(0, layout.end % 4);
    }
}
