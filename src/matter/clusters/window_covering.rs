//! WindowCovering cluster handler for rs-matter integration.
//!
//! Implements the lift-only, position-aware subset of the Matter
//! WindowCovering cluster (0x0102) that a vent needs. Movement commands are
//! translated into TargetPositionLiftPercent100ths writes.

use std::sync::Arc;
use std::sync::atomic::AtomicU32;

use rs_matter::dm::{
    Access, Attribute, Cluster, Command, Dataver, Handler, InvokeContext, InvokeReply,
    NonBlockingHandler, Quality, ReadContext, ReadReply, Reply, WriteContext,
};
use rs_matter::error::{Error, ErrorCode};
use rs_matter::tlv::{FromTLV, Nullable};
use rs_matter::{attribute_enum, attributes, command_enum, commands, with};

use super::{commit_controller_write, encode_value, sync_dataver_with_store};
use crate::matter::attribute_store::{AttrValue, AttributePath, AttributeStore};
use crate::matter::ids::{ClusterId, EndpointId, WindowCoveringAttribute, WindowCoveringCommand};
use crate::matter::platform::PlatformEvents;
use crate::matter::units::PERCENT100THS_MAX;

/// WindowCovering Cluster ID (Matter spec)
pub const CLUSTER_ID: u32 = ClusterId::WindowCovering as u32;

/// Cluster revision
pub const CLUSTER_REVISION: u16 = 5;

/// Feature bits for this cluster
pub mod features {
    pub const LIFT: u32 = 0x0001;
    pub const POSITION_AWARE_LIFT: u32 = 0x0004;
}

attribute_enum!(WindowCoveringAttribute);
command_enum!(WindowCoveringCommand);

/// Full WindowCovering cluster definition
pub const CLUSTER: Cluster<'static> = Cluster {
    id: CLUSTER_ID,
    revision: CLUSTER_REVISION,
    feature_map: features::LIFT | features::POSITION_AWARE_LIFT,
    attributes: attributes!(
        Attribute::new(WindowCoveringAttribute::Type as _, Access::RV, Quality::NONE),
        Attribute::new(
            WindowCoveringAttribute::ConfigStatus as _,
            Access::RV,
            Quality::NONE
        ),
        Attribute::new(
            WindowCoveringAttribute::CurrentPositionLiftPercentage as _,
            Access::RV,
            Quality::X
        ),
        Attribute::new(
            WindowCoveringAttribute::OperationalStatus as _,
            Access::RV,
            Quality::NONE
        ),
        Attribute::new(
            WindowCoveringAttribute::TargetPositionLiftPercent100ths as _,
            Access::RWVM,
            Quality::X
        ),
        Attribute::new(
            WindowCoveringAttribute::EndProductType as _,
            Access::RV,
            Quality::NONE
        ),
        Attribute::new(
            WindowCoveringAttribute::CurrentPositionLiftPercent100ths as _,
            Access::RV,
            Quality::X
        ),
        Attribute::new(WindowCoveringAttribute::Mode as _, Access::RWVM, Quality::NONE),
    ),
    commands: commands!(
        Command::new(WindowCoveringCommand::UpOrOpen as _, None, Access::WO),
        Command::new(WindowCoveringCommand::DownOrClose as _, None, Access::WO),
        Command::new(WindowCoveringCommand::StopMotion as _, None, Access::WO),
        Command::new(
            WindowCoveringCommand::GoToLiftPercentage as _,
            None,
            Access::WO
        ),
    ),
    with_attrs: with!(all),
    with_cmds: with!(all),
};

/// Handler serving the vent's WindowCovering cluster from the attribute store.
pub struct WindowCoveringHandler {
    dataver: Dataver,
    endpoint_id: EndpointId,
    store: Arc<AttributeStore>,
    events: Arc<dyn PlatformEvents>,
    last_store_version: AtomicU32,
}

impl WindowCoveringHandler {
    /// The cluster definition for this handler
    pub const CLUSTER: Cluster<'static> = CLUSTER;

    pub fn new(
        dataver: Dataver,
        endpoint_id: EndpointId,
        store: Arc<AttributeStore>,
        events: Arc<dyn PlatformEvents>,
    ) -> Self {
        Self {
            dataver,
            endpoint_id,
            store,
            events,
            last_store_version: AtomicU32::new(0),
        }
    }

    fn path(&self, attr: WindowCoveringAttribute) -> AttributePath {
        AttributePath::window_covering(self.endpoint_id, attr)
    }

    fn set_target(&self, percent100ths: Option<u16>) -> Result<(), Error> {
        if let Some(value) = percent100ths
            && value > PERCENT100THS_MAX
        {
            return Err(ErrorCode::ConstraintError.into());
        }
        commit_controller_write(
            &self.store,
            self.events.as_ref(),
            self.path(WindowCoveringAttribute::TargetPositionLiftPercent100ths),
            AttrValue::NullableU16(percent100ths),
        )?;
        self.dataver.changed();
        Ok(())
    }

    fn read_impl(&self, ctx: impl ReadContext, reply: impl ReadReply) -> Result<(), Error> {
        sync_dataver_with_store(
            &self.store,
            self.endpoint_id,
            CLUSTER_ID,
            &self.last_store_version,
            &self.dataver,
        );

        let attr = ctx.attr();

        let Some(mut writer) = reply.with_dataver(self.dataver.get())? else {
            return Ok(()); // No update needed (dataver match)
        };

        if attr.is_system() {
            return CLUSTER.read(attr, writer);
        }

        let attr_id: WindowCoveringAttribute = attr.attr_id.try_into()?;
        let value = self
            .store
            .get(&self.path(attr_id))
            .ok_or(ErrorCode::AttributeNotFound)?;

        let tag = writer.tag();
        {
            let mut tw = writer.writer();
            encode_value(&mut tw, tag, &value)?;
        }

        writer.complete()
    }

    fn write_impl(&self, ctx: impl WriteContext) -> Result<(), Error> {
        let attr = ctx.attr();
        let data = ctx.data();

        attr.check_dataver(self.dataver.get())?;

        match attr.attr_id.try_into()? {
            WindowCoveringAttribute::TargetPositionLiftPercent100ths => {
                let value = Nullable::<u16>::from_tlv(&data)?;
                self.set_target(value.into_option())
            }
            WindowCoveringAttribute::Mode => {
                let mode: u8 = data.u8()?;
                commit_controller_write(
                    &self.store,
                    self.events.as_ref(),
                    self.path(WindowCoveringAttribute::Mode),
                    AttrValue::U8(mode),
                )?;
                self.dataver.changed();
                Ok(())
            }
            _ => Err(ErrorCode::UnsupportedAccess.into()),
        }
    }

    fn invoke_impl(&self, ctx: impl InvokeContext, _reply: impl InvokeReply) -> Result<(), Error> {
        let cmd = ctx.cmd();
        let data = ctx.data();

        match cmd.cmd_id.try_into()? {
            WindowCoveringCommand::UpOrOpen => {
                log::info!("[Matter] UpOrOpen on endpoint {}", self.endpoint_id);
                self.set_target(Some(0))
            }
            WindowCoveringCommand::DownOrClose => {
                log::info!("[Matter] DownOrClose on endpoint {}", self.endpoint_id);
                self.set_target(Some(PERCENT100THS_MAX))
            }
            WindowCoveringCommand::StopMotion => {
                log::info!("[Matter] StopMotion on endpoint {}", self.endpoint_id);
                let current = self
                    .store
                    .get(&self.path(WindowCoveringAttribute::CurrentPositionLiftPercent100ths))
                    .and_then(|v| v.as_u16());
                match current {
                    Some(position) => self.set_target(Some(position)),
                    // Position unknown, nothing to hold.
                    None => Ok(()),
                }
            }
            WindowCoveringCommand::GoToLiftPercentage => {
                let mut seq = data.structure()?;
                let percent100ths = seq.scan_ctx(0)?.u16()?;
                log::info!(
                    "[Matter] GoToLiftPercentage {} on endpoint {}",
                    percent100ths,
                    self.endpoint_id
                );
                self.set_target(Some(percent100ths))
            }
        }
    }
}

impl Handler for WindowCoveringHandler {
    fn read(&self, ctx: impl ReadContext, reply: impl ReadReply) -> Result<(), Error> {
        self.read_impl(ctx, reply)
    }

    fn write(&self, ctx: impl WriteContext) -> Result<(), Error> {
        self.write_impl(ctx)
    }

    fn invoke(&self, ctx: impl InvokeContext, reply: impl InvokeReply) -> Result<(), Error> {
        self.invoke_impl(ctx, reply)
    }
}

impl NonBlockingHandler for WindowCoveringHandler {}
