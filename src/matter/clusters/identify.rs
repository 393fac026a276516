//! Identify cluster handler.
//!
//! The vent has no light or buzzer, so identify requests are forwarded to the
//! bridge as start/stop events and the actuator decides how to show them.

use std::sync::Arc;
use std::sync::atomic::AtomicU32;

use rs_matter::dm::{
    Access, Attribute, Cluster, Command, Dataver, Handler, InvokeContext, InvokeReply,
    NonBlockingHandler, Quality, ReadContext, ReadReply, Reply, WriteContext,
};
use rs_matter::error::{Error, ErrorCode};
use rs_matter::{attribute_enum, attributes, command_enum, commands, with};

use super::{commit_controller_write, encode_value, sync_dataver_with_store};
use crate::matter::attribute_store::{AttrValue, AttributePath, AttributeStore};
use crate::matter::ids::{ClusterId, EndpointId, IdentifyAttribute, IdentifyCommand};
use crate::matter::platform::{IdentifyEvent, PlatformEvents};

pub const CLUSTER_ID: u32 = ClusterId::Identify as u32;

pub const CLUSTER_REVISION: u16 = 5;

/// TriggerEffect identifiers that end an ongoing effect.
const EFFECT_FINISH: u8 = 0xFE;
const EFFECT_STOP: u8 = 0xFF;

attribute_enum!(IdentifyAttribute);
command_enum!(IdentifyCommand);

pub const CLUSTER: Cluster<'static> = Cluster {
    id: CLUSTER_ID,
    revision: CLUSTER_REVISION,
    feature_map: 0,
    attributes: attributes!(
        Attribute::new(IdentifyAttribute::IdentifyTime as _, Access::RWVO, Quality::NONE),
        Attribute::new(IdentifyAttribute::IdentifyType as _, Access::RV, Quality::NONE),
    ),
    commands: commands!(
        Command::new(IdentifyCommand::Identify as _, None, Access::WM),
        Command::new(IdentifyCommand::TriggerEffect as _, None, Access::WM),
    ),
    with_attrs: with!(all),
    with_cmds: with!(all),
};

/// Map a TriggerEffect request to a bridge event.
pub fn effect_event(effect_id: u8, effect_variant: u8) -> IdentifyEvent {
    match effect_id {
        EFFECT_FINISH | EFFECT_STOP => IdentifyEvent::Stop,
        _ => IdentifyEvent::Start {
            effect_id,
            effect_variant,
        },
    }
}

/// Map an IdentifyTime value to a bridge event.
pub fn time_event(identify_time: u16) -> IdentifyEvent {
    if identify_time > 0 {
        IdentifyEvent::Start {
            effect_id: 0,
            effect_variant: 0,
        }
    } else {
        IdentifyEvent::Stop
    }
}

pub struct IdentifyHandler {
    dataver: Dataver,
    endpoint_id: EndpointId,
    store: Arc<AttributeStore>,
    events: Arc<dyn PlatformEvents>,
    last_store_version: AtomicU32,
}

impl IdentifyHandler {
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

    fn identify_for(&self, identify_time: u16) -> Result<(), Error> {
        commit_controller_write(
            &self.store,
            self.events.as_ref(),
            AttributePath::identify(self.endpoint_id, IdentifyAttribute::IdentifyTime),
            AttrValue::U16(identify_time),
        )?;
        self.dataver.changed();
        self.events
            .on_identify(self.endpoint_id, time_event(identify_time));
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
            return Ok(());
        };

        if attr.is_system() {
            return CLUSTER.read(attr, writer);
        }

        let attr_id: IdentifyAttribute = attr.attr_id.try_into()?;
        let value = self
            .store
            .get(&AttributePath::identify(self.endpoint_id, attr_id))
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
        attr.check_dataver(self.dataver.get())?;

        match attr.attr_id.try_into()? {
            IdentifyAttribute::IdentifyTime => {
                let identify_time = ctx.data().u16()?;
                self.identify_for(identify_time)
            }
            IdentifyAttribute::IdentifyType => Err(ErrorCode::UnsupportedAccess.into()),
        }
    }

    fn invoke_impl(&self, ctx: impl InvokeContext, _reply: impl InvokeReply) -> Result<(), Error> {
        let cmd = ctx.cmd();
        let data = ctx.data();

        match cmd.cmd_id.try_into()? {
            IdentifyCommand::Identify => {
                let mut seq = data.structure()?;
                let identify_time = seq.scan_ctx(0)?.u16()?;
                log::info!(
                    "[Matter] Identify for {}s on endpoint {}",
                    identify_time,
                    self.endpoint_id
                );
                self.identify_for(identify_time)
            }
            IdentifyCommand::TriggerEffect => {
                let mut seq = data.structure()?;
                let effect_id = seq.scan_ctx(0)?.u8()?;
                let effect_variant = seq.scan_ctx(1)?.u8()?;
                log::info!(
                    "[Matter] TriggerEffect {:#04x}/{:#04x} on endpoint {}",
                    effect_id,
                    effect_variant,
                    self.endpoint_id
                );
                self.events
                    .on_identify(self.endpoint_id, effect_event(effect_id, effect_variant));
                Ok(())
            }
        }
    }
}

impl Handler for IdentifyHandler {
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

impl NonBlockingHandler for IdentifyHandler {}
