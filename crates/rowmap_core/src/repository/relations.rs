//! Eager relationship resolution.

use crate::driver::{Condition, SelectColumn, SelectQuery};
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::meta::{RelationKind, RelationshipDescriptor};
use crate::repository::{Criteria, FindOptions, Repository};
use crate::value::Value;

impl Repository<'_> {
    /// Resolves every declared relationship of the entity and attaches the
    /// results through the entity's relationship fields.
    ///
    /// Attached targets are loaded shallow, so resolution does not recurse
    /// through the relationship graph. A relationship with zero matches
    /// leaves its field unset. The entity reads as clean afterwards.
    ///
    /// # Errors
    ///
    /// Metadata errors (unregistered targets, missing inverse sides) and
    /// driver failures propagate.
    pub fn resolve_relationships(&self, entity: &mut Entity) -> CoreResult<()> {
        let descriptors: Vec<RelationshipDescriptor> = self.resolver().relationships().to_vec();
        for descriptor in &descriptors {
            match descriptor.kind {
                RelationKind::OneToOne | RelationKind::ManyToOne => {
                    if descriptor.is_owning() {
                        self.attach_owning_singular(entity, descriptor)?;
                    } else {
                        self.attach_inverse_singular(entity, descriptor)?;
                    }
                }
                RelationKind::OneToMany => self.attach_one_to_many(entity, descriptor)?,
                RelationKind::ManyToMany => self.attach_many_to_many(entity, descriptor)?,
            }
        }
        entity.refresh_snapshot();
        Ok(())
    }

    /// Owning side: the join column's id names the target row directly.
    fn attach_owning_singular(
        &self,
        entity: &mut Entity,
        descriptor: &RelationshipDescriptor,
    ) -> CoreResult<()> {
        let target_id = entity
            .scalar(&descriptor.id_field())
            .and_then(Value::as_i64)
            .or_else(|| entity.related(&descriptor.field).and_then(Entity::id));
        let Some(target_id) = target_id else {
            return Ok(());
        };

        let mut target_repo = self.entity_manager().repository(&descriptor.target)?;
        if let Some(target) = target_repo.find(target_id, false)? {
            entity.set_related(&descriptor.field, target)?;
        }
        Ok(())
    }

    /// Inverse side: the target type holds the join column referencing
    /// this entity's id.
    fn attach_inverse_singular(
        &self,
        entity: &mut Entity,
        descriptor: &RelationshipDescriptor,
    ) -> CoreResult<()> {
        let Some(id) = entity.id() else {
            return Ok(());
        };

        let mut target_repo = self.entity_manager().repository(&descriptor.target)?;
        let join_column = target_repo
            .resolver()
            .owning_relation_referencing(self.entity_name())
            .and_then(|r| r.join_column.clone())
            .ok_or_else(|| CoreError::missing_inverse(self.entity_name(), &descriptor.target))?;

        let found =
            target_repo.find_one_by(&Criteria::new().and(format!("{join_column} = ?"), id), false, Vec::new())?;
        if let Some(target) = found {
            entity.set_related(&descriptor.field, target)?;
        }
        Ok(())
    }

    /// One-to-many: query the target's foreign-key column for this id.
    fn attach_one_to_many(
        &self,
        entity: &mut Entity,
        descriptor: &RelationshipDescriptor,
    ) -> CoreResult<()> {
        let Some(id) = entity.id() else {
            return Ok(());
        };

        let mut target_repo = self.entity_manager().repository(&descriptor.target)?;
        let join_column = target_repo
            .resolver()
            .owning_relation_referencing(self.entity_name())
            .and_then(|r| r.join_column.clone())
            .ok_or_else(|| CoreError::missing_inverse(self.entity_name(), &descriptor.target))?;

        target_repo.find_by(
            &Criteria::new().and(format!("{join_column} = ?"), id),
            &FindOptions::default(),
        )?;
        let children = target_repo.take_models();
        if !children.is_empty() {
            entity.set_collection(&descriptor.field, children)?;
        }
        Ok(())
    }

    /// Many-to-many: read target ids from the join table, then batch-fetch
    /// the targets with one `IN` query.
    fn attach_many_to_many(
        &self,
        entity: &mut Entity,
        descriptor: &RelationshipDescriptor,
    ) -> CoreResult<()> {
        let Some(id) = entity.id() else {
            return Ok(());
        };
        let join = descriptor
            .join_table
            .as_ref()
            .ok_or_else(|| CoreError::missing_join_table(self.entity_name(), &descriptor.field))?;

        let query = SelectQuery::new(&join.table, vec![SelectColumn::plain(&join.target_column)])
            .and_where(Condition::bind(format!("{} = ?", join.local_column), id));
        let rows = self.entity_manager().driver().select(&query)?;
        let ids: Vec<i64> = rows
            .iter()
            .filter_map(|row| row.get(&join.target_column).and_then(Value::as_i64))
            .collect();
        if ids.is_empty() {
            return Ok(());
        }

        let mut target_repo = self.entity_manager().repository(&descriptor.target)?;
        let membership =
            Condition::in_list(target_repo.resolver().primary_field(), &ids).expr;
        target_repo.find_by(&Criteria::new().and_raw(membership), &FindOptions::default())?;
        let children = target_repo.take_models();
        if !children.is_empty() {
            entity.set_collection(&descriptor.field, children)?;
        }
        Ok(())
    }
}
